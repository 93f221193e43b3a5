//! Interactive command console
//!
//! Thin line-based dispatch over the controller's operations. Commands are
//! queued on the same channel as button presses, so the console can never
//! race a hardware-initiated transition; the `mode` query reads the
//! controller's published mode directly.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::controller::Command;
use crate::gadget::EmulationMode;

const HELP: &[(&str, &str)] = &[
    ("help", "Display this message"),
    ("version", "Display version info"),
    ("exit", "Disable the gadget and quit"),
    ("shutdown", "Shut down the system"),
    ("disable", "Disable the gadget"),
    ("mode", "Show the current mode"),
    ("switch [mode]", "Switch to a specific mode (cdrom/1, store/2)"),
    ("switch", "Toggle to the other mode (like the hardware button)"),
    ("update", "Check for an update payload on the image store"),
];

/// Print the version banner.
pub fn print_version() {
    println!(
        "emucd {} - publish disc images over USB from a single-board computer",
        env!("CARGO_PKG_VERSION")
    );
}

/// What a console line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleAction {
    Empty,
    Help,
    Version,
    ShowMode,
    Send(Command),
    /// Dispatch the command, then stop reading input
    SendAndQuit(Command),
    Invalid(String),
    InvalidArgs(String),
}

fn parse_line(line: &str) -> ConsoleAction {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return ConsoleAction::Empty;
    };

    match command {
        "help" => ConsoleAction::Help,
        "version" => ConsoleAction::Version,
        "mode" => ConsoleAction::ShowMode,
        "disable" => ConsoleAction::Send(Command::Disable),
        "update" => ConsoleAction::Send(Command::CheckUpdate),
        "exit" => ConsoleAction::SendAndQuit(Command::Exit),
        "shutdown" => ConsoleAction::SendAndQuit(Command::RequestShutdown),
        "switch" => match words.next() {
            None => ConsoleAction::Send(Command::ToggleMode),
            Some("cdrom") | Some("1") => ConsoleAction::Send(Command::SwitchCdRom),
            Some("store") | Some("2") => ConsoleAction::Send(Command::SwitchStore),
            Some(other) => ConsoleAction::InvalidArgs(other.to_string()),
        },
        other => ConsoleAction::Invalid(other.to_string()),
    }
}

/// Reads commands from stdin and queues them for the controller
pub struct Console {
    commands: mpsc::Sender<Command>,
    mode: watch::Receiver<EmulationMode>,
}

impl Console {
    pub fn new(commands: mpsc::Sender<Command>, mode: watch::Receiver<EmulationMode>) -> Self {
        Self { commands, mode }
    }

    pub async fn run(self) {
        println!("\nType 'help' for a list of commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("emucd> ");
            let _ = std::io::stdout().flush();

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                // EOF: treat a closed stdin like an exit request.
                Ok(None) => {
                    let _ = self.commands.send(Command::Exit).await;
                    break;
                }
                Err(e) => {
                    warn!("console read failed: {}", e);
                    break;
                }
            };

            match parse_line(&line) {
                ConsoleAction::Empty => {}
                ConsoleAction::Help => print_help(),
                ConsoleAction::Version => print_version(),
                ConsoleAction::ShowMode => {
                    println!("Current mode: {}", *self.mode.borrow());
                }
                ConsoleAction::Send(command) => {
                    if self.commands.send(command).await.is_err() {
                        break;
                    }
                }
                ConsoleAction::SendAndQuit(command) => {
                    let _ = self.commands.send(command).await;
                    break;
                }
                ConsoleAction::Invalid(command) => {
                    println!("Invalid command: {}", command);
                }
                ConsoleAction::InvalidArgs(args) => {
                    println!("Invalid arguments: {}", args);
                }
            }
        }
    }
}

fn print_help() {
    for (command, text) in HELP {
        println!("{:<16}{}", command, text);
    }
}
