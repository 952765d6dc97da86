use std::thread;
use std::time::Duration;

use crate::decoder::{decode_bytes, decode_scalar};
use crate::error::Result;
use crate::transport::SampleSource;
use crate::types::AccelSample;

/// Query for one `x,y,z` acceleration reply.
pub const SAMPLE_QUERY: &[u8] = b";39\n";
/// Query for the battery percentage.
pub const BATTERY_QUERY: &[u8] = b";202\n";

pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Command protocol spoken over a [`SampleSource`].
pub struct SensorDevice<S: SampleSource> {
    source: S,
    backoff: Duration,
    dropped: u64,
}

impl<S: SampleSource> SensorDevice<S> {
    pub fn new(source: S) -> Self {
        Self::with_backoff(source, DEFAULT_BACKOFF)
    }

    /// Pause applied after a timeout or malformed reply before the next request.
    pub fn with_backoff(source: S, backoff: Duration) -> Self {
        Self {
            source,
            backoff,
            dropped: 0,
        }
    }

    /// One request/reply round trip. Every failure is returned as-is.
    pub fn request_sample(&mut self) -> Result<AccelSample> {
        self.source.write(SAMPLE_QUERY)?;
        let line = self.source.read_line()?;
        Ok(decode_bytes(&line)?)
    }

    /// Like [`Self::request_sample`] but swallows per-sample failures.
    ///
    /// Timeouts and decode failures back off and yield `Ok(None)`; any other
    /// error propagates.
    pub fn next_sample(&mut self) -> Result<Option<AccelSample>> {
        match self.request_sample() {
            Ok(sample) => Ok(Some(sample)),
            Err(e) if e.is_recoverable() => {
                self.dropped += 1;
                log::debug!("Dropped sample ({}), backing off {:?}", e, self.backoff);
                if !self.backoff.is_zero() {
                    thread::sleep(self.backoff);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Battery level as reported by the device, in percent.
    pub fn battery_percent(&mut self) -> Result<f64> {
        self.source.write(BATTERY_QUERY)?;
        let line = self.source.read_line()?;
        Ok(decode_scalar(&line)?)
    }

    /// Samples skipped by [`Self::next_sample`] so far.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::transport::ScriptedSource;

    fn device(lines: &[&str]) -> SensorDevice<ScriptedSource> {
        SensorDevice::with_backoff(ScriptedSource::from_lines(lines), Duration::ZERO)
    }

    #[test]
    fn test_request_sample_sends_query() {
        let mut dev = device(&["0,0,1"]);
        let sample = dev.request_sample().unwrap();
        assert_eq!(sample, AccelSample::new(0.0, 0.0, 1.0));
        assert_eq!(dev.source().commands(), &[SAMPLE_QUERY.to_vec()]);
    }

    #[test]
    fn test_next_sample_skips_recoverable() {
        let mut source = ScriptedSource::from_lines(["garbage"]);
        source.push_timeout();
        source.push_line("0.1,0.2,0.3");
        let mut dev = SensorDevice::with_backoff(source, Duration::ZERO);

        assert_eq!(dev.next_sample().unwrap(), None);
        assert_eq!(dev.next_sample().unwrap(), None);
        assert_eq!(
            dev.next_sample().unwrap(),
            Some(AccelSample::new(0.1, 0.2, 0.3))
        );
        assert_eq!(dev.dropped_samples(), 2);
    }

    struct BrokenLink;

    impl SampleSource for BrokenLink {
        fn write(&mut self, _data: &[u8]) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "link down").into())
        }

        fn read_line(&mut self) -> Result<Vec<u8>> {
            Err(TrackerError::Timeout)
        }
    }

    #[test]
    fn test_next_sample_propagates_fatal() {
        let mut dev = SensorDevice::with_backoff(BrokenLink, Duration::ZERO);
        assert!(matches!(dev.next_sample(), Err(TrackerError::Io(_))));
    }

    #[test]
    fn test_battery_percent() {
        let mut dev = device(&["76.0"]);
        assert_eq!(dev.battery_percent().unwrap(), 76.0);
        assert_eq!(dev.source().commands(), &[BATTERY_QUERY.to_vec()]);
    }
}
