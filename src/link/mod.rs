//! Serial link to the temperature device
//!
//! [`SerialLink`] owns the connection handle and its lifecycle. The actual
//! byte transport sits behind two small traits so the ingest path does not
//! care whether it talks to real hardware:
//!
//! - [`Connector`] - opens a named endpoint and enumerates endpoints
//! - [`LineTransport`] - an open endpoint that yields whole lines
//!
//! # Components
//!
//! - [`SerialPortConnector`] - real hardware via the `serialport` crate
//! - [`ScriptedConnector`] - scripted or channel-fed lines for tests
//! - `SimulatorConnector` - a fake device on the `sim` port (feature
//!   `mock-link`)
//!
//! # Read semantics
//!
//! [`SerialLink::read_line`] blocks for at most the configured timeout and
//! returns a [`ReadOutcome`]. Silence is [`ReadOutcome::Timeout`], not an
//! error. [`ReadOutcome::Closed`] means the link is gone until the next
//! explicit connect.

pub mod mock;
pub mod serial;
#[cfg(feature = "mock-link")]
pub mod sim;

pub use mock::{ScriptedConnector, ScriptedTransport};
pub use serial::{SerialPortConnector, SerialTransport};
#[cfg(feature = "mock-link")]
pub use sim::{SimulatorConnector, SIMULATOR_PORT};

use crate::config::SerialSettings;
use crate::error::Result;
use crate::types::ConnectionState;
use std::sync::Arc;

/// Result of a single read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its terminator
    Line(String),
    /// Nothing arrived within the read timeout
    Timeout,
    /// The link is closed or the device went away
    Closed(String),
}

/// An available serial endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Name passed to [`SerialLink::connect`] (e.g. "COM7", "/dev/ttyUSB0")
    pub name: String,
    /// Human-readable description (e.g. "COM7: FTDI USB Serial")
    pub description: String,
}

impl PortInfo {
    /// Create a port entry
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

/// Opens endpoints by name
///
/// Implementations must be shareable across threads: the session keeps one
/// for port enumeration while the ingest thread owns the link.
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send + Sync {
    /// Open `port` with the given parameters
    fn open(&self, port: &str, settings: &SerialSettings) -> Result<Box<dyn LineTransport>>;

    /// List endpoints that can be opened
    fn list_ports(&self) -> Vec<PortInfo>;
}

/// An open endpoint that yields whole lines
pub trait LineTransport: Send {
    /// Block up to the read timeout for the next line
    fn read_line(&mut self) -> ReadOutcome;

    /// Name of the endpoint this transport was opened on
    fn port_name(&self) -> &str;
}

/// The connection to the device
///
/// At most one transport is open at a time. A failed open never leaves a
/// half-open handle behind.
pub struct SerialLink {
    connector: Arc<dyn Connector>,
    settings: SerialSettings,
    transport: Option<Box<dyn LineTransport>>,
    state: ConnectionState,
}

impl SerialLink {
    /// Create a disconnected link
    pub fn new(connector: Arc<dyn Connector>, settings: SerialSettings) -> Self {
        Self {
            connector,
            settings,
            transport: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Open `port`, closing any existing connection first
    pub fn connect(&mut self, port: &str) -> ConnectionState {
        if self.transport.is_some() {
            self.disconnect();
        }

        match self.connector.open(port, &self.settings) {
            Ok(transport) => {
                tracing::info!(
                    "Connected to {} at {} baud",
                    port,
                    self.settings.baud_rate
                );
                self.transport = Some(transport);
                self.state = ConnectionState::Connected(port.to_string());
            }
            Err(e) => {
                tracing::error!("Connection to {} failed: {}", port, e);
                self.state = ConnectionState::Error(e.to_string());
            }
        }

        self.state.clone()
    }

    /// Close the connection, if any
    pub fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            tracing::info!("Disconnected from {}", transport.port_name());
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Read the next line
    ///
    /// On device loss the handle is dropped and the state becomes
    /// [`ConnectionState::Error`].
    pub fn read_line(&mut self) -> ReadOutcome {
        let Some(transport) = self.transport.as_mut() else {
            return ReadOutcome::Closed("link is not open".to_string());
        };

        let outcome = transport.read_line();
        if let ReadOutcome::Closed(reason) = &outcome {
            tracing::error!("Link to {} closed: {}", transport.port_name(), reason);
            self.transport = None;
            self.state = ConnectionState::Error(format!("link closed: {}", reason));
        }
        outcome
    }

    /// Current connection state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Check whether a transport is open
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Name of the open port
    pub fn port_name(&self) -> Option<&str> {
        self.transport.as_ref().map(|t| t.port_name())
    }

    /// Endpoints the connector can open
    pub fn list_ports(&self) -> Vec<PortInfo> {
        self.connector.list_ports()
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Connector used by the application binary
///
/// With the `mock-link` feature the simulated device is available as an
/// extra port alongside real hardware.
pub fn default_connector() -> Arc<dyn Connector> {
    #[cfg(feature = "mock-link")]
    {
        Arc::new(SimulatorConnector::new(SerialPortConnector))
    }
    #[cfg(not(feature = "mock-link"))]
    {
        Arc::new(SerialPortConnector)
    }
}
