//! Push button monitor
//!
//! Watches the button GPIO line for edges on a blocking thread, debounces
//! them on a tokio task, raises a synthetic `Held` event when a press lasts
//! past the hold threshold, and forwards classified commands to the
//! controller's command channel. Transitions are never invoked from the
//! edge context itself.

use gpio_cdev::{Chip, EventRequestFlags, EventType, LineRequestFlags};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::classifier::InputClassifier;
use super::types::ButtonEvent;
use crate::config::ButtonConfig;
use crate::controller::Command;
use crate::error::{AppError, Result};

/// Watches the hardware button and emits controller commands
pub struct ButtonMonitor;

impl ButtonMonitor {
    /// Request the button line and start watching it.
    pub fn spawn(config: ButtonConfig, commands: mpsc::Sender<Command>) -> Result<JoinHandle<()>> {
        let mut chip = Chip::new(&config.gpio_chip)
            .map_err(|e| AppError::Internal(format!("button GPIO chip failed: {}", e)))?;

        let line = chip.get_line(config.pin).map_err(|e| {
            AppError::Internal(format!("button GPIO line {} failed: {}", config.pin, e))
        })?;

        let events = line
            .events(
                LineRequestFlags::INPUT,
                EventRequestFlags::BOTH_EDGES,
                "emucd-button",
            )
            .map_err(|e| AppError::Internal(format!("button GPIO request failed: {}", e)))?;

        info!(
            "watching button on {} pin {}",
            config.gpio_chip, config.pin
        );

        // Edge reads block, so they live on a plain thread feeding a channel.
        let (edge_tx, edge_rx) = mpsc::channel::<bool>(16);
        let active_low = config.active_low;
        std::thread::spawn(move || {
            for event in events {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("button event read failed: {}", e);
                        continue;
                    }
                };
                let falling = event.event_type() == EventType::FallingEdge;
                let pressed = falling == active_low;
                if edge_tx.blocking_send(pressed).is_err() {
                    break;
                }
            }
        });

        Ok(tokio::spawn(Self::run(config, edge_rx, commands)))
    }

    /// Debounce raw edges, synthesize `Held`, and forward commands.
    async fn run(
        config: ButtonConfig,
        mut edges: mpsc::Receiver<bool>,
        commands: mpsc::Sender<Command>,
    ) {
        let mut classifier = InputClassifier::new();
        let mut pressed = false;
        let mut last_edge = Instant::now() - config.debounce();
        let mut hold_deadline: Option<Instant> = None;

        loop {
            let edge = tokio::select! {
                edge = edges.recv() => match edge {
                    Some(edge) => Some(edge),
                    None => break,
                },
                _ = async { sleep_until(hold_deadline.unwrap()).await },
                    if hold_deadline.is_some() =>
                {
                    None
                }
            };

            let event = match edge {
                // Hold deadline elapsed while the button stayed down.
                None => {
                    hold_deadline = None;
                    ButtonEvent::Held
                }
                Some(edge_pressed) => {
                    let now = Instant::now();
                    if edge_pressed == pressed || now.duration_since(last_edge) < config.debounce()
                    {
                        debug!("ignoring button bounce");
                        continue;
                    }
                    last_edge = now;
                    pressed = edge_pressed;
                    if edge_pressed {
                        hold_deadline = Some(now + config.hold());
                        ButtonEvent::Pressed
                    } else {
                        hold_deadline = None;
                        ButtonEvent::Released
                    }
                }
            };

            if let Some(command) = classifier.handle(event) {
                debug!("button raised {:?}", command);
                if commands.send(command).await.is_err() {
                    break;
                }
            }
        }
    }
}
