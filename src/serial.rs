// src/serial.rs
use crate::drivers::{ByteSource, PlotterError};
use std::io::{self, Read};
use std::thread;
use std::time::Duration;

// 串口读超时 (只读已到达的字节，正常情况下不会触发)
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens a byte source for a port name and baud rate.
pub trait PortOpener {
    fn open(&self, port: &str, baud: u32) -> Result<Box<dyn ByteSource>, serialport::Error>;
}

/// How often and how patiently to retry a failed open.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Real hardware opener backed by the `serialport` crate.
pub struct SerialPortOpener;

impl PortOpener for SerialPortOpener {
    fn open(&self, port: &str, baud: u32) -> Result<Box<dyn ByteSource>, serialport::Error> {
        let port = serialport::new(port, baud).timeout(READ_TIMEOUT).open()?;
        Ok(Box::new(SerialSource { port }))
    }
}

/// Non-blocking adapter: only reads what `bytes_to_read` says is waiting.
pub struct SerialSource {
    port: Box<dyn serialport::SerialPort>,
}

impl ByteSource for SerialSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = available.min(buf.len());
        self.port.read(&mut buf[..want])
    }
}

/// Names of the serial ports the OS currently reports.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(err) => {
            log::warn!("failed to enumerate serial ports: {err}");
            Vec::new()
        }
    }
}

/// Try to open `port` up to `policy.attempts` times, sleeping between tries.
///
/// `on_retry` is told about every failed attempt that will be retried.
pub fn open_with_retry(
    opener: &dyn PortOpener,
    port: &str,
    baud: u32,
    policy: RetryPolicy,
    mut on_retry: impl FnMut(usize, &serialport::Error),
) -> Result<Box<dyn ByteSource>, PlotterError> {
    if port.trim().is_empty() {
        return Err(PlotterError::NoPortSelected);
    }
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match opener.open(port, baud) {
            Ok(source) => return Ok(source),
            Err(err) if attempt < attempts => {
                on_retry(attempt, &err);
                thread::sleep(policy.backoff);
                attempt += 1;
            }
            Err(source) => {
                return Err(PlotterError::Open {
                    port: port.to_owned(),
                    attempts,
                    source,
                })
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn succeeds_after_transient_failures() {
        let opener = FlakyOpener::new(2, Vec::new());
        let mut retries = Vec::new();
        let result = open_with_retry(&opener, "COM3", 9600, no_wait(), |attempt, _| {
            retries.push(attempt)
        });
        assert!(result.is_ok());
        assert_eq!(opener.calls.get(), 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let opener = FlakyOpener::new(5, Vec::new());
        let result = open_with_retry(&opener, "/dev/ttyUSB0", 115200, no_wait(), |_, _| {});
        match result {
            Err(PlotterError::Open { port, attempts, .. }) => {
                assert_eq!(port, "/dev/ttyUSB0");
                assert_eq!(attempts, 3);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("open should have failed"),
        }
        assert_eq!(opener.calls.get(), 3);
    }

    #[test]
    fn empty_port_name_is_rejected_without_trying() {
        let opener = FlakyOpener::new(0, Vec::new());
        let result = open_with_retry(&opener, "  ", 9600, no_wait(), |_, _| {});
        assert!(matches!(result, Err(PlotterError::NoPortSelected)));
        assert_eq!(opener.calls.get(), 0);
    }
}
