//! Operator command dispatch
//!
//! [`ControlSurface`] turns [`ControlCommand`]s into session operations and
//! reports each outcome as a [`CommandStatus`]. It also remembers the port
//! and output file that last worked in [`AppState`].
//!
//! # Console syntax
//!
//! | Input                   | Command            |
//! |-------------------------|--------------------|
//! | `ports`                 | `ListPorts`        |
//! | `connect [port]`        | `Connect`          |
//! | `disconnect`            | `Disconnect`       |
//! | `start`                 | `StartLogging`     |
//! | `new`                   | `NewSession`       |
//! | `stop`                  | `StopLogging`      |
//! | `save [path]`           | `StartSaving`      |
//! | `nosave`                | `StopSaving`       |
//! | `status`                | `Status`           |
//! | `help`                  | `Help`             |
//! | `quit`                  | `Quit`             |

use crate::config::{AppConfig, AppState};
use crate::ingest::Session;
use crate::types::ConnectionState;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Help text listing the console commands
pub const HELP: &str = "\
Commands:
  ports            list serial ports (selects the first if none is selected)
  connect [port]   open a port (default: selected or last used port)
  disconnect       close the port
  start            start logging
  new              clear the data and start a new session
  stop             stop logging
  save [path]      save data to a CSV file (default: timestamped file)
  nosave           stop saving
  status           show connection, logging and saving state
  help             show this text
  quit             exit";

/// An operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Enumerate serial endpoints
    ListPorts,
    /// Connect to a port, or to the selected one
    Connect(Option<String>),
    /// Close the connection
    Disconnect,
    /// Start or resume logging
    StartLogging,
    /// Clear the series and start logging from zero
    NewSession,
    /// Stop logging
    StopLogging,
    /// Save to a file, or to a generated file name
    StartSaving(Option<PathBuf>),
    /// Stop saving
    StopSaving,
    /// Report the current state
    Status,
    /// Show the command list
    Help,
    /// Exit the program
    Quit,
}

/// Input that is not a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?} (try \"help\")")]
    Unknown(String),

    #[error("{command} takes no arguments")]
    UnexpectedArgument { command: String },
}

impl FromStr for ControlCommand {
    type Err = CommandParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Err(CommandParseError::Empty),
            "connect" | "c" => return Ok(ControlCommand::Connect(argument)),
            "save" => return Ok(ControlCommand::StartSaving(argument.map(PathBuf::from))),
            "ports" | "list" | "refresh" => ControlCommand::ListPorts,
            "disconnect" => ControlCommand::Disconnect,
            "start" => ControlCommand::StartLogging,
            "new" => ControlCommand::NewSession,
            "stop" => ControlCommand::StopLogging,
            "nosave" | "stop-saving" => ControlCommand::StopSaving,
            "status" | "s" => ControlCommand::Status,
            "help" | "?" => ControlCommand::Help,
            "quit" | "exit" | "q" => ControlCommand::Quit,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };

        if argument.is_some() {
            return Err(CommandParseError::UnexpectedArgument {
                command: word.to_string(),
            });
        }
        Ok(command)
    }
}

/// Outcome of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    /// Whether the command did what was asked
    pub ok: bool,
    /// Text for the operator
    pub message: String,
}

impl CommandStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ok {
            f.write_str(&self.message)
        } else {
            write!(f, "error: {}", self.message)
        }
    }
}

/// Dispatches operator commands to a session
pub struct ControlSurface {
    session: Session,
    config: AppConfig,
    app_state: AppState,
    /// Where app state is saved; `None` keeps it in memory only
    app_state_path: Option<PathBuf>,
    selected_port: Option<String>,
}

impl ControlSurface {
    /// Create a control surface over `session`
    ///
    /// The last used port (or the configured default) is preselected.
    pub fn new(session: Session, config: AppConfig, app_state: AppState) -> Self {
        let selected_port = app_state
            .last_port
            .clone()
            .or_else(|| config.serial.default_port.clone());

        Self {
            session,
            config,
            app_state,
            app_state_path: None,
            selected_port,
        }
    }

    /// Persist app state to `path` whenever it changes
    pub fn with_app_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_state_path = Some(path.into());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    /// Port used by `connect` without an argument
    pub fn selected_port(&self) -> Option<&str> {
        self.selected_port.as_deref()
    }

    /// Run one command
    pub fn execute(&mut self, command: ControlCommand) -> CommandStatus {
        tracing::debug!("Command: {:?}", command);
        self.session.reap();

        match command {
            ControlCommand::ListPorts => self.list_ports(),
            ControlCommand::Connect(port) => self.connect(port),
            ControlCommand::Disconnect => {
                self.session.disconnect();
                CommandStatus::ok("Disconnected")
            }
            ControlCommand::StartLogging => match self.session.start() {
                Ok(()) => CommandStatus::ok("Logging started"),
                Err(e) => CommandStatus::failed(e.to_string()),
            },
            ControlCommand::NewSession => match self.session.new_session() {
                Ok(()) => CommandStatus::ok("New session started"),
                Err(e) => CommandStatus::failed(e.to_string()),
            },
            ControlCommand::StopLogging => {
                self.session.stop();
                CommandStatus::ok("Logging stopped")
            }
            ControlCommand::StartSaving(path) => self.start_saving(path),
            ControlCommand::StopSaving => {
                self.session.disable_persistence();
                CommandStatus::ok("Saving stopped")
            }
            ControlCommand::Status => CommandStatus::ok(self.status_report()),
            ControlCommand::Help => CommandStatus::ok(HELP),
            ControlCommand::Quit => {
                self.session.shutdown();
                CommandStatus::ok("Bye")
            }
        }
    }

    /// One-line summary of the session
    pub fn status_line(&self) -> String {
        format!(
            "{} | {} | {} | {} samples",
            self.session.connection_state(),
            self.session.logging_state(),
            self.session.persistence_state(),
            self.session.series().len()
        )
    }

    fn status_report(&self) -> String {
        let stats = self.session.stats();
        let mut report = self.status_line();
        report.push_str(&format!(
            "\nlines {} | samples {} | decode errors {} ({:.1}% ok) | timeouts {} | writes {}",
            stats.lines_read,
            stats.samples_committed,
            stats.decode_errors,
            stats.decode_success_rate(),
            stats.timeouts,
            stats.persistence_writes,
        ));
        if let Some(duration) = stats.last_write_duration {
            report.push_str(&format!(" (last {:?})", duration));
        }
        if stats.dropped_events > 0 {
            report.push_str(&format!(" | dropped events {}", stats.dropped_events));
        }
        if let Some(port) = &self.selected_port {
            report.push_str(&format!("\nselected port: {}", port));
        }
        report
    }

    fn list_ports(&mut self) -> CommandStatus {
        let ports = self.session.list_ports();
        if ports.is_empty() {
            return CommandStatus::ok("No serial ports found");
        }

        if self.selected_port.is_none() {
            self.selected_port = Some(ports[0].name.clone());
        }

        let lines: Vec<String> = ports
            .iter()
            .map(|p| {
                let marker = if Some(p.name.as_str()) == self.selected_port.as_deref() {
                    '*'
                } else {
                    ' '
                };
                format!("{} {}", marker, p)
            })
            .collect();
        CommandStatus::ok(lines.join("\n"))
    }

    fn connect(&mut self, port: Option<String>) -> CommandStatus {
        let port = match port.or_else(|| self.selected_port.clone()) {
            Some(port) => port,
            None => match self.session.list_ports().into_iter().next() {
                Some(first) => first.name,
                None => return CommandStatus::failed("No port selected and none available"),
            },
        };

        match self.session.connect(&port) {
            ConnectionState::Connected(port) => {
                self.selected_port = Some(port.clone());
                self.app_state.remember_port(port.clone());
                self.save_app_state();
                CommandStatus::ok(format!("Connected to {}", port))
            }
            ConnectionState::Error(reason) => CommandStatus::failed(reason),
            ConnectionState::Disconnected => CommandStatus::failed("Not connected"),
        }
    }

    fn start_saving(&mut self, path: Option<PathBuf>) -> CommandStatus {
        let path = path.unwrap_or_else(|| {
            self.config
                .persistence
                .default_output_path(chrono::Local::now())
        });

        match self.session.enable_persistence(path.clone()) {
            Ok(()) => {
                self.app_state.remember_save_path(path.clone());
                self.save_app_state();
                CommandStatus::ok(format!("Saving to {}", path.display()))
            }
            Err(e) => CommandStatus::failed(e.to_string()),
        }
    }

    fn save_app_state(&self) {
        if let Some(path) = &self.app_state_path {
            if let Err(e) = self.app_state.save_to(path) {
                tracing::warn!("Failed to save app state: {}", e);
            }
        }
    }
}
