//! Real hardware transport via the `serialport` crate
//!
//! Bytes are accumulated until a newline arrives, so a line split across
//! several reads (or across a timeout) is reassembled before it is handed
//! to the decoder. Invalid UTF-8 is replaced rather than rejected; the
//! decoder then refuses the line as non-numeric.

use super::{Connector, LineTransport, PortInfo, ReadOutcome};
use crate::config::SerialSettings;
use crate::error::{Result, ThermoLogError};
use serialport::{SerialPort, SerialPortType};
use std::io::{ErrorKind, Read};

/// Longest line kept before it is flushed to the decoder as-is
pub const MAX_LINE_BYTES: usize = 4096;

/// Opens real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortConnector;

impl Connector for SerialPortConnector {
    fn open(&self, port: &str, settings: &SerialSettings) -> Result<Box<dyn LineTransport>> {
        let handle = serialport::new(port, settings.baud_rate)
            .timeout(settings.read_timeout())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| ThermoLogError::LinkOpen {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(SerialTransport::new(port, handle)))
    }

    fn list_ports(&self) -> Vec<PortInfo> {
        let ports = match serialport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                tracing::warn!("Port enumeration failed: {}", e);
                return Vec::new();
            }
        };

        let mut out: Vec<PortInfo> = ports
            .into_iter()
            .map(|p| {
                let description = match p.port_type {
                    SerialPortType::UsbPort(info) => {
                        let parts: Vec<String> =
                            [info.manufacturer, info.product].into_iter().flatten().collect();
                        if parts.is_empty() {
                            format!("{}: USB Serial", p.port_name)
                        } else {
                            format!("{}: {}", p.port_name, parts.join(" "))
                        }
                    }
                    SerialPortType::BluetoothPort => format!("{}: Bluetooth", p.port_name),
                    SerialPortType::PciPort => format!("{}: PCI", p.port_name),
                    SerialPortType::Unknown => p.port_name.clone(),
                };
                PortInfo::new(p.port_name, description)
            })
            .collect();

        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

/// An open serial port yielding newline-terminated lines
pub struct SerialTransport<R = Box<dyn SerialPort>> {
    port_name: String,
    reader: R,
    pending: Vec<u8>,
}

impl<R: Read + Send> SerialTransport<R> {
    /// Wrap an open reader
    pub fn new(port_name: impl Into<String>, reader: R) -> Self {
        Self {
            port_name: port_name.into(),
            reader,
            pending: Vec::with_capacity(256),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None if self.pending.len() >= MAX_LINE_BYTES => self.pending.len(),
            None => return None,
        };
        let raw: Vec<u8> = self.pending.drain(..end).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<R: Read + Send> LineTransport for SerialTransport<R> {
    fn read_line(&mut self) -> ReadOutcome {
        let mut buf = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return ReadOutcome::Line(line);
            }

            match self.reader.read(&mut buf) {
                // Some platforms report a timeout as a zero-length read
                Ok(0) => return ReadOutcome::Timeout,
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    return ReadOutcome::Timeout
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return ReadOutcome::Closed(e.to_string()),
            }
        }
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Reader that replays a fixed list of read results
    struct ChunkReader(VecDeque<io::Result<Vec<u8>>>);

    impl ChunkReader {
        fn new(chunks: Vec<io::Result<&[u8]>>) -> Self {
            Self(chunks.into_iter().map(|c| c.map(|b| b.to_vec())).collect())
        }
    }

    impl Read for ChunkReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.0.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    fn timeout() -> io::Result<&'static [u8]> {
        Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
    }

    #[test]
    fn test_reads_whole_lines() {
        let reader = ChunkReader::new(vec![Ok(&b"1,2,3,4\r\n5,6,7,8\n"[..])]);
        let mut transport = SerialTransport::new("test", reader);

        assert_eq!(transport.read_line(), ReadOutcome::Line("1,2,3,4".into()));
        assert_eq!(transport.read_line(), ReadOutcome::Line("5,6,7,8".into()));
        assert_eq!(transport.read_line(), ReadOutcome::Timeout);
    }

    #[test]
    fn test_reassembles_line_across_timeout() {
        let reader = ChunkReader::new(vec![Ok(&b"23.4"[..]), timeout(), Ok(&b"5,1,2,3\n"[..])]);
        let mut transport = SerialTransport::new("test", reader);

        assert_eq!(transport.read_line(), ReadOutcome::Timeout);
        assert_eq!(transport.read_line(), ReadOutcome::Line("23.45,1,2,3".into()));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let reader = ChunkReader::new(vec![Ok(&b"1,\xff,3,4\n"[..])]);
        let mut transport = SerialTransport::new("test", reader);

        match transport.read_line() {
            ReadOutcome::Line(line) => assert!(line.contains('\u{FFFD}')),
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_overlong_line_is_flushed() {
        let junk = vec![b'x'; MAX_LINE_BYTES];
        let reader = ChunkReader(VecDeque::from(vec![Ok(junk)]));
        let mut transport = SerialTransport::new("test", reader);

        match transport.read_line() {
            ReadOutcome::Line(line) => assert_eq!(line.len(), MAX_LINE_BYTES),
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_io_error_closes() {
        let reader = ChunkReader::new(vec![Err(io::Error::new(
            ErrorKind::BrokenPipe,
            "device removed",
        ))]);
        let mut transport = SerialTransport::new("test", reader);

        assert!(
            matches!(transport.read_line(), ReadOutcome::Closed(reason) if reason.contains("device removed"))
        );
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let reader = ChunkReader::new(vec![
            Err(io::Error::new(ErrorKind::Interrupted, "signal")),
            Ok(&b"9,9,9,9\n"[..]),
        ]);
        let mut transport = SerialTransport::new("test", reader);

        assert_eq!(transport.read_line(), ReadOutcome::Line("9,9,9,9".into()));
    }
}
