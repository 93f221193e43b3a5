//! Button press classifier
//!
//! Turns Pressed/Released/Held edges into controller commands: a short press
//! toggles the emulation mode, a long hold requests shutdown. The hold flag
//! is consulted on release so a hold never also fires the toggle.

use super::types::ButtonEvent;
use crate::controller::Command;

/// Classifies button edges into commands
#[derive(Debug, Default)]
pub struct InputClassifier {
    was_held: bool,
}

impl InputClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event; returns the command it completes, if any.
    pub fn handle(&mut self, event: ButtonEvent) -> Option<Command> {
        match event {
            ButtonEvent::Pressed => {
                self.was_held = false;
                None
            }
            ButtonEvent::Held => {
                self.was_held = true;
                Some(Command::RequestShutdown)
            }
            ButtonEvent::Released => {
                if self.was_held {
                    None
                } else {
                    Some(Command::ToggleMode)
                }
            }
        }
    }
}
