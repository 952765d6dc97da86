use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use super::SampleSource;
use crate::error::{Result, TrackerError};

/// In-memory source that answers each request with the next scripted reply.
///
/// `None` entries behave like a transport timeout. Once the script runs out
/// every read times out, as a silent device would.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    replies: VecDeque<Option<Vec<u8>>>,
    commands: Vec<Vec<u8>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut source = Self::new();
        for line in lines {
            source.push_line(line.as_ref());
        }
        source
    }

    pub fn push_line(&mut self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        if !bytes.ends_with(b"\n") {
            bytes.push(b'\n');
        }
        self.replies.push_back(Some(bytes));
    }

    pub fn push_timeout(&mut self) {
        self.replies.push_back(None);
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    /// Every command written so far, in order.
    pub fn commands(&self) -> &[Vec<u8>] {
        &self.commands
    }
}

impl SampleSource for ScriptedSource {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.commands.push(data.to_vec());
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        match self.replies.pop_front() {
            Some(Some(line)) => Ok(line),
            Some(None) | None => Err(TrackerError::Timeout),
        }
    }
}

/// Load a capture of raw device replies, one per line (`.gz` supported).
///
/// Blank lines are kept as empty replies so recorded dropouts replay as
/// decode failures.
pub fn load_capture(path: &Path) -> Result<ScriptedSource> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut source = ScriptedSource::new();
    for line in reader.lines() {
        source.push_line(&line?);
    }
    log::info!(
        "Loaded {} replies from {}",
        source.remaining(),
        path.display()
    );
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_scripted_replies_in_order() {
        let mut source = ScriptedSource::from_lines(["1,2,3", "4,5,6"]);
        source.write(b";39\n").unwrap();
        assert_eq!(source.read_line().unwrap(), b"1,2,3\n".to_vec());
        assert_eq!(source.read_line().unwrap(), b"4,5,6\n".to_vec());
        assert!(matches!(source.read_line(), Err(TrackerError::Timeout)));
        assert_eq!(source.commands(), &[b";39\n".to_vec()]);
    }

    #[test]
    fn test_scripted_timeout_entry() {
        let mut source = ScriptedSource::new();
        source.push_timeout();
        source.push_line("0,0,1");
        assert!(matches!(source.read_line(), Err(TrackerError::Timeout)));
        assert_eq!(source.read_line().unwrap(), b"0,0,1\n".to_vec());
    }

    #[test]
    fn test_load_plain_and_gzip_capture() {
        let dir = std::env::temp_dir();
        let stamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let plain = dir.join(format!("rep_capture_{}.txt", stamp));
        std::fs::write(&plain, "0,0,1\n\n0.5,0,1\n").unwrap();
        let source = load_capture(&plain).unwrap();
        assert_eq!(source.remaining(), 3);

        let gz = dir.join(format!("rep_capture_{}.txt.gz", stamp));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"0,0,1\n0,0,1\n").unwrap();
        std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
        let mut source = load_capture(&gz).unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.read_line().unwrap(), b"0,0,1\n".to_vec());

        let _ = std::fs::remove_file(plain);
        let _ = std::fs::remove_file(gz);
    }
}
