use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::SampleSource;
use crate::error::{Result, TrackerError};

const READ_CHUNK: usize = 64;
const MAX_LINE_BYTES: usize = 256;

/// Newline framing over a byte stream whose reads time out.
///
/// Bytes accumulate until `\n`. A timeout (or zero-length read) with no
/// complete line drops any partial reply and yields `TrackerError::Timeout`.
/// More than `MAX_LINE_BYTES` without a terminator is discarded.
pub struct LineReader<R: Read> {
    name: String,
    inner: R,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(name: &str, inner: R) -> Self {
        Self {
            name: name.to_string(),
            inner,
            pending: Vec::with_capacity(MAX_LINE_BYTES),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Bytes received but not yet returned as a line.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => return self.timed_out(),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if self.pending.len() > MAX_LINE_BYTES && !self.pending.contains(&b'\n') {
                        log::warn!(
                            "{}: discarding {} bytes without line terminator",
                            self.name,
                            self.pending.len()
                        );
                        self.pending.clear();
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return self.timed_out(),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        Some(self.pending.drain(..=end).collect())
    }

    fn timed_out(&mut self) -> Result<Vec<u8>> {
        if !self.pending.is_empty() {
            log::debug!(
                "{}: dropping {} byte partial reply after timeout",
                self.name,
                self.pending.len()
            );
            self.pending.clear();
        }
        Err(TrackerError::Timeout)
    }
}

/// Serial (or Bluetooth SPP) link to the sensor.
pub struct SerialSource {
    reader: LineReader<Box<dyn SerialPort>>,
}

impl SerialSource {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g. "COM4" or "/dev/rfcomm0")
    /// * `baud_rate` - Baud rate (the sensor ships at 115200)
    /// * `timeout` - Bound on each blocking read or write
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| {
                log::error!("Failed to open serial port {}: {}", path, e);
                TrackerError::Serial(e)
            })?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(Self {
            reader: LineReader::new(path, port),
        })
    }

    /// Names of serial ports visible to the OS.
    pub fn list_ports() -> Vec<String> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.reader.name()
    }
}

impl SampleSource for SerialSource {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        match self.reader.get_mut().write_all(data) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(TrackerError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        self.reader.read_line()
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        let _ = self.reader.get_mut().flush();
        log::info!("Serial port {} closed", self.reader.name());
    }
}
