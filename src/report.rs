use serde::{Deserialize, Serialize};

use crate::types::{RepSummary, SpeedTrace};

pub const DEFAULT_GOAL_VELOCITY: f64 = 1.2; // m/s

/// Round up to the next even integer (3.2 -> 4, 4.0 -> 4).
pub fn round_up_to_even(value: f64) -> usize {
    ((value / 2.0).ceil() * 2.0).max(0.0) as usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepOutcome {
    /// 1-based position in the set.
    pub rep_number: usize,
    pub index: usize,
    pub peak_velocity: f64,
    pub width: f64,
    pub hit_goal: bool,
    /// Inclusive index range centred on the peak.
    pub window: (usize, usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepReport {
    pub goal_velocity: f64,
    pub reps: Vec<RepOutcome>,
}

impl RepReport {
    pub fn build(trace: &SpeedTrace, summary: &RepSummary, goal_velocity: f64) -> Self {
        let last = trace.len().saturating_sub(1);
        let reps = summary
            .iter()
            .enumerate()
            .map(|(i, peak)| {
                let peak_velocity = trace.get(peak.index).unwrap_or(0.0);
                let half = round_up_to_even(peak.width) / 2;
                RepOutcome {
                    rep_number: i + 1,
                    index: peak.index,
                    peak_velocity,
                    width: peak.width,
                    hit_goal: peak_velocity > goal_velocity,
                    window: (
                        peak.index.saturating_sub(half),
                        (peak.index + half).min(last),
                    ),
                }
            })
            .collect();

        Self {
            goal_velocity,
            reps,
        }
    }

    pub fn rep_count(&self) -> usize {
        self.reps.len()
    }

    pub fn reps_on_target(&self) -> usize {
        self.reps.iter().filter(|r| r.hit_goal).count()
    }

    pub fn mean_peak_velocity(&self) -> Option<f64> {
        if self.reps.is_empty() {
            return None;
        }
        let total: f64 = self.reps.iter().map(|r| r.peak_velocity).sum();
        Some(total / self.reps.len() as f64)
    }

    pub fn best_rep(&self) -> Option<&RepOutcome> {
        self.reps
            .iter()
            .max_by(|a, b| a.peak_velocity.total_cmp(&b.peak_velocity))
    }

    /// Slice of the trace belonging to one rep.
    pub fn rep_slice<'a>(&self, trace: &'a SpeedTrace, rep: &RepOutcome) -> &'a [f64] {
        let (start, end) = rep.window;
        trace.as_slice().get(start..=end).unwrap_or(&[])
    }

    /// One line per rep, for console output.
    pub fn format_lines(&self) -> Vec<String> {
        self.reps
            .iter()
            .map(|r| {
                format!(
                    "Rep {}: {:.2} m/s at sample {} (width {:.1}) {}",
                    r.rep_number,
                    r.peak_velocity,
                    r.index,
                    r.width,
                    if r.hit_goal { "✓" } else { "✗ below target" }
                )
            })
            .collect()
    }
}
