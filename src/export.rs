use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::report::RepReport;
use crate::session::{SessionMetadata, SessionOutcome};
use crate::types::RepSummary;

/// One row of the exported time series, velocity in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub t: u64,
    pub acc: f64,
    pub vf: f64,
}

/// Complete session export (JSON-serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub metadata: SessionMetadata,
    pub series: Vec<SeriesRow>,
    pub summary: RepSummary,
    pub report: RepReport,
}

impl SessionExport {
    pub fn from_outcome(outcome: &SessionOutcome) -> Self {
        let series = outcome
            .series
            .timestamps()
            .iter()
            .zip(outcome.series.acceleration())
            .zip(outcome.speed.as_slice())
            .map(|((&t, &acc), &vf)| SeriesRow { t, acc, vf })
            .collect();

        Self {
            metadata: outcome.metadata.clone(),
            series,
            summary: outcome.summary.clone(),
            report: outcome.report.clone(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize to JSON bytes
    pub fn to_json_bytes(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Series as `index,t,acc,vf` rows with a header line.
    pub fn to_csv(&self) -> String {
        let mut csv = String::with_capacity(32 * (self.series.len() + 1));
        csv.push_str("index,t,acc,vf\n");
        for (i, row) in self.series.iter().enumerate() {
            csv.push_str(&format!("{},{},{},{}\n", i, row.t, row.acc, row.vf));
        }
        csv
    }

    /// Write `sensor_data_{ns}.csv` and `session_{ns}.json` into `dir`.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let csv_path = dir.join(csv_file_name(self.metadata.start_ns));
        std::fs::write(&csv_path, self.to_csv())?;

        let json_path = dir.join(json_file_name(self.metadata.start_ns));
        std::fs::write(&json_path, self.to_json_bytes()?)?;

        log::info!(
            "Exported {} rows to {} and {}",
            self.series.len(),
            csv_path.display(),
            json_path.display()
        );
        Ok((csv_path, json_path))
    }
}

pub fn csv_file_name(start_ns: u64) -> String {
    format!("sensor_data_{}.csv", start_ns)
}

pub fn json_file_name(start_ns: u64) -> String {
    format!("session_{}.json", start_ns)
}
