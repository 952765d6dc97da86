//! Transport layer between the core and the sensor link.

use crate::error::Result;

mod replay;
mod serial;

pub use replay::{load_capture, ScriptedSource};
pub use serial::{LineReader, SerialSource};

/// Blocking request/reply link to the sensor.
///
/// Implementations own the connection exclusively; the core issues one
/// `write` then one `read_line` per sample and never overlaps requests.
pub trait SampleSource {
    /// Send a command to the device.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Block until a newline-terminated reply arrives.
    ///
    /// Returns [`crate::error::TrackerError::Timeout`] when the transport's
    /// bounded wait elapses without a complete line.
    fn read_line(&mut self) -> Result<Vec<u8>>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        (**self).read_line()
    }
}
