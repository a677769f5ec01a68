//! Scripted transports for testing without hardware
//!
//! [`ScriptedConnector`] serves named ports whose lines come from one of two
//! sources:
//!
//! - a fixed script of [`ReadOutcome`]s, replayed in order
//! - a feed: a crossbeam channel the test pushes lines into while the
//!   ingest thread is running
//!
//! # Example
//!
//! ```ignore
//! use thermolog::link::{ReadOutcome, ScriptedConnector};
//!
//! let (connector, feed) = ScriptedConnector::new()
//!     .with_script("COM1", vec![ReadOutcome::Line("20,21,22,23".into())])
//!     .with_feed("COM2");
//! feed.send("1,2,3,4".to_string())?;
//! ```

use super::{Connector, LineTransport, PortInfo, ReadOutcome};
use crate::config::SerialSettings;
use crate::error::{Result, ThermoLogError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Upper bound on the idle sleep of an exhausted script
const EXHAUSTED_IDLE: Duration = Duration::from_millis(5);

#[derive(Clone)]
enum PortSource {
    Script {
        outcomes: Vec<ReadOutcome>,
        close_when_exhausted: bool,
    },
    Feed(Receiver<String>),
}

/// A connector whose ports produce predetermined lines
#[derive(Default)]
pub struct ScriptedConnector {
    ports: Mutex<BTreeMap<String, PortSource>>,
}

impl ScriptedConnector {
    /// Create a connector with no ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port that replays `outcomes`, then times out forever
    pub fn with_script(self, port: impl Into<String>, outcomes: Vec<ReadOutcome>) -> Self {
        self.insert(
            port.into(),
            PortSource::Script {
                outcomes,
                close_when_exhausted: false,
            },
        );
        self
    }

    /// Add a port that replays `outcomes`, then reports the device gone
    pub fn with_finite_script(self, port: impl Into<String>, outcomes: Vec<ReadOutcome>) -> Self {
        self.insert(
            port.into(),
            PortSource::Script {
                outcomes,
                close_when_exhausted: true,
            },
        );
        self
    }

    /// Add a port fed through the returned sender
    ///
    /// Dropping the sender makes the port report [`ReadOutcome::Closed`].
    pub fn with_feed(self, port: impl Into<String>) -> (Self, Sender<String>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.insert(port.into(), PortSource::Feed(rx));
        (self, tx)
    }

    fn insert(&self, port: String, source: PortSource) {
        self.ports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(port, source);
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, port: &str, settings: &SerialSettings) -> Result<Box<dyn LineTransport>> {
        let ports = self.ports.lock().unwrap_or_else(|e| e.into_inner());
        let source = ports.get(port).cloned().ok_or_else(|| ThermoLogError::LinkOpen {
            port: port.to_string(),
            reason: "no such device".to_string(),
        })?;

        let transport = match source {
            PortSource::Script {
                outcomes,
                close_when_exhausted,
            } => ScriptedTransport::new(port, outcomes)
                .close_when_exhausted(close_when_exhausted)
                .with_idle(settings.read_timeout().min(EXHAUSTED_IDLE)),
            PortSource::Feed(rx) => ScriptedTransport::from_feed(port, rx, settings.read_timeout()),
        };
        Ok(Box::new(transport))
    }

    fn list_ports(&self) -> Vec<PortInfo> {
        self.ports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .map(|name| PortInfo::new(name.clone(), format!("{}: Scripted", name)))
            .collect()
    }
}

enum Source {
    Script {
        pending: VecDeque<ReadOutcome>,
        close_when_exhausted: bool,
        idle: Duration,
    },
    Feed {
        rx: Receiver<String>,
        timeout: Duration,
    },
}

/// A transport replaying scripted outcomes or forwarding fed lines
pub struct ScriptedTransport {
    port_name: String,
    source: Source,
}

impl ScriptedTransport {
    /// Replay `outcomes` in order
    pub fn new(port_name: impl Into<String>, outcomes: Vec<ReadOutcome>) -> Self {
        Self {
            port_name: port_name.into(),
            source: Source::Script {
                pending: outcomes.into(),
                close_when_exhausted: false,
                idle: EXHAUSTED_IDLE,
            },
        }
    }

    /// Forward lines received on `rx`, timing out after `timeout`
    pub fn from_feed(port_name: impl Into<String>, rx: Receiver<String>, timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            source: Source::Feed { rx, timeout },
        }
    }

    /// Report the device gone once the script runs out
    pub fn close_when_exhausted(mut self, close: bool) -> Self {
        if let Source::Script {
            close_when_exhausted,
            ..
        } = &mut self.source
        {
            *close_when_exhausted = close;
        }
        self
    }

    /// Sleep this long on each read after the script runs out
    pub fn with_idle(mut self, duration: Duration) -> Self {
        if let Source::Script { idle, .. } = &mut self.source {
            *idle = duration;
        }
        self
    }
}

impl LineTransport for ScriptedTransport {
    fn read_line(&mut self) -> ReadOutcome {
        match &mut self.source {
            Source::Script {
                pending,
                close_when_exhausted,
                idle,
            } => match pending.pop_front() {
                Some(outcome) => outcome,
                None if *close_when_exhausted => ReadOutcome::Closed("end of script".to_string()),
                None => {
                    std::thread::sleep(*idle);
                    ReadOutcome::Timeout
                }
            },
            Source::Feed { rx, timeout } => match rx.recv_timeout(*timeout) {
                Ok(line) => ReadOutcome::Line(line),
                Err(RecvTimeoutError::Timeout) => ReadOutcome::Timeout,
                Err(RecvTimeoutError::Disconnected) => {
                    ReadOutcome::Closed("feed closed".to_string())
                }
            },
        }
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }
}
