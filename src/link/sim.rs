//! Simulated temperature device
//!
//! Adds a `sim` port to another connector. The simulated device emits one
//! frame roughly every 250 ms: four slow sine waves around room temperature
//! with a little noise, plus the occasional garbled line so the decode error
//! path gets exercised too.
//!
//! Only available with the `mock-link` feature:
//!
//! ```bash
//! cargo run --features mock-link
//! ```

use super::{Connector, LineTransport, PortInfo, ReadOutcome};
use crate::config::SerialSettings;
use crate::error::Result;
use crate::types::CHANNEL_COUNT;
use std::time::{Duration, Instant};

/// Name of the simulated port
pub const SIMULATOR_PORT: &str = "sim";

/// Interval between simulated frames
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

/// Every n-th frame is garbled
const GARBLE_EVERY: u64 = 40;

/// A connector exposing [`SIMULATOR_PORT`] next to the ports of `inner`
pub struct SimulatorConnector<C> {
    inner: C,
}

impl<C: Connector> SimulatorConnector<C> {
    /// Wrap a connector
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Connector> Connector for SimulatorConnector<C> {
    fn open(&self, port: &str, settings: &SerialSettings) -> Result<Box<dyn LineTransport>> {
        if port == SIMULATOR_PORT {
            return Ok(Box::new(SimulatedDevice::new(settings.read_timeout())));
        }
        self.inner.open(port, settings)
    }

    fn list_ports(&self) -> Vec<PortInfo> {
        let mut ports = self.inner.list_ports();
        ports.push(PortInfo::new(
            SIMULATOR_PORT,
            format!("{}: Simulated device", SIMULATOR_PORT),
        ));
        ports
    }
}

/// Per-channel waveform
#[derive(Debug, Clone, Copy)]
struct Wave {
    offset: f64,
    amplitude: f64,
    period_secs: f64,
}

impl Wave {
    fn value(&self, t: f64, noise: f64) -> f64 {
        self.offset
            + self.amplitude * (2.0 * std::f64::consts::PI * t / self.period_secs).sin()
            + noise
    }
}

const WAVES: [Wave; CHANNEL_COUNT] = [
    Wave { offset: 22.0, amplitude: 1.5, period_secs: 30.0 },
    Wave { offset: 25.0, amplitude: 3.0, period_secs: 45.0 },
    Wave { offset: 60.0, amplitude: 10.0, period_secs: 90.0 },
    Wave { offset: 4.0, amplitude: 0.5, period_secs: 20.0 },
];

struct SimulatedDevice {
    started: Instant,
    next_frame: Instant,
    frames: u64,
    read_timeout: Duration,
    seed: u64,
}

impl SimulatedDevice {
    fn new(read_timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            next_frame: now,
            frames: 0,
            read_timeout,
            seed: 0x2545_F491_4F6C_DD1D,
        }
    }

    // xorshift, enough for display noise
    fn noise(&mut self) -> f64 {
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 7;
        self.seed ^= self.seed << 17;
        ((self.seed as f64) / (u64::MAX as f64) - 0.5) * 0.2
    }

    fn frame(&mut self) -> String {
        self.frames += 1;
        if self.frames % GARBLE_EVERY == 0 {
            return "ERR,sensor,fault".to_string();
        }

        let t = self.started.elapsed().as_secs_f64();
        let values: Vec<String> = WAVES
            .iter()
            .map(|w| {
                let noise = self.noise();
                format!("{:.2}", w.value(t, noise))
            })
            .collect();
        values.join(",")
    }
}

impl LineTransport for SimulatedDevice {
    fn read_line(&mut self) -> ReadOutcome {
        let now = Instant::now();
        if self.next_frame > now {
            let wait = self.next_frame - now;
            if wait > self.read_timeout {
                std::thread::sleep(self.read_timeout);
                return ReadOutcome::Timeout;
            }
            std::thread::sleep(wait);
        }
        self.next_frame += FRAME_INTERVAL;
        ReadOutcome::Line(self.frame())
    }

    fn port_name(&self) -> &str {
        SIMULATOR_PORT
    }
}
