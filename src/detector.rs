//! Rep detection: velocity peaks and their half-prominence widths.
//!
//! Peak selection follows the usual order: local maxima (plateaus resolve to
//! their midpoint), then a height floor, then distance suppression where the
//! highest remaining peak wins and neighbours closer than `min_distance` are
//! discarded. Widths are measured at a fraction of each peak's prominence
//! with linear interpolation between samples.

use serde::{Deserialize, Serialize};

use crate::types::{Peak, RepSummary, SpeedTrace};

pub const DEFAULT_MIN_HEIGHT: f64 = 0.4; // m/s
pub const DEFAULT_MIN_DISTANCE: usize = 15; // samples
pub const DEFAULT_REL_HEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepDetectorConfig {
    /// Minimum peak value.
    pub min_height: f64,
    /// Minimum index separation between accepted peaks.
    pub min_distance: usize,
    /// Fraction of prominence at which width is measured.
    pub rel_height: f64,
}

impl Default for RepDetectorConfig {
    fn default() -> Self {
        Self {
            min_height: DEFAULT_MIN_HEIGHT,
            min_distance: DEFAULT_MIN_DISTANCE,
            rel_height: DEFAULT_REL_HEIGHT,
        }
    }
}

/// Prominence of a peak and the bases it was measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prominence {
    pub value: f64,
    pub left_base: usize,
    pub right_base: usize,
}

/// Width of a peak at a given evaluation height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakWidth {
    pub width: f64,
    pub height: f64,
    pub left_ip: f64,
    pub right_ip: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RepDetector {
    config: RepDetectorConfig,
}

impl RepDetector {
    pub fn new(config: RepDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RepDetectorConfig {
        &self.config
    }

    /// Detect reps in a velocity trace. Pure: same input, same output.
    pub fn detect(&self, trace: &SpeedTrace) -> RepSummary {
        self.detect_detailed(trace.as_slice())
            .into_iter()
            .map(|(index, w)| Peak {
                index,
                width: w.width,
            })
            .collect()
    }

    /// Peaks with full width geometry, ascending by index.
    pub fn detect_detailed(&self, values: &[f64]) -> Vec<(usize, PeakWidth)> {
        let peaks = find_peaks(values, self.config.min_height, self.config.min_distance);
        let widths = peak_widths(values, &peaks, self.config.rel_height);
        peaks.into_iter().zip(widths).collect()
    }
}

/// Indices of strict local maxima. A flat top yields its (lower) midpoint.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if values.len() < 3 {
        return maxima;
    }
    let last = values.len() - 1;

    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                let right_edge = ahead - 1;
                maxima.push((i + right_edge) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Local maxima at or above `min_height`, thinned to `min_distance`.
pub fn find_peaks(values: &[f64], min_height: f64, min_distance: usize) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(values)
        .into_iter()
        .filter(|&i| values[i] >= min_height)
        .collect();
    select_by_distance(values, &candidates, min_distance)
}

/// Keep the highest peaks first and drop any neighbour within `min_distance`.
fn select_by_distance(values: &[f64], peaks: &[usize], min_distance: usize) -> Vec<usize> {
    if min_distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    // Stable sort: among equal heights the later peak is visited first
    order.sort_by(|&a, &b| values[peaks[a]].total_cmp(&values[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < min_distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < min_distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Vertical drop from a peak to the higher of its two surrounding minima.
///
/// Each side is searched outward until the signal rises above the peak or
/// the series ends.
pub fn prominence(values: &[f64], peak: usize) -> Prominence {
    let top = values[peak];

    let mut left_min = top;
    let mut left_base = peak;
    let mut i = peak as isize;
    while i >= 0 && values[i as usize] <= top {
        if values[i as usize] < left_min {
            left_min = values[i as usize];
            left_base = i as usize;
        }
        i -= 1;
    }

    let mut right_min = top;
    let mut right_base = peak;
    let mut i = peak;
    while i < values.len() && values[i] <= top {
        if values[i] < right_min {
            right_min = values[i];
            right_base = i;
        }
        i += 1;
    }

    Prominence {
        value: top - left_min.max(right_min),
        left_base,
        right_base,
    }
}

/// Width of each peak at `rel_height` of its prominence below the top.
pub fn peak_widths(values: &[f64], peaks: &[usize], rel_height: f64) -> Vec<PeakWidth> {
    peaks
        .iter()
        .map(|&peak| width_at(values, peak, &prominence(values, peak), rel_height))
        .collect()
}

fn width_at(values: &[f64], peak: usize, prom: &Prominence, rel_height: f64) -> PeakWidth {
    let height = values[peak] - prom.value * rel_height;

    let mut i = peak;
    while prom.left_base < i && height < values[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if values[i] < height {
        left_ip += (height - values[i]) / (values[i + 1] - values[i]);
    }

    let mut i = peak;
    while i < prom.right_base && height < values[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if values[i] < height {
        right_ip -= (height - values[i]) / (values[i - 1] - values[i]);
    }

    PeakWidth {
        width: right_ip - left_ip,
        height,
        left_ip,
        right_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_REPS: [f64; 19] = [
        0.0, 0.0, 0.0, 0.0, 0.1, 0.5, 0.9, 1.3, 0.9, 0.5, 0.1, 0.0, 0.0, 0.1, 0.6, 1.5, 0.8, 0.2,
        0.0,
    ];

    fn detector(min_distance: usize) -> RepDetector {
        RepDetector::new(RepDetectorConfig {
            min_distance,
            ..RepDetectorConfig::default()
        })
    }

    #[test]
    fn test_local_maxima() {
        assert_eq!(local_maxima(&TWO_REPS), vec![7, 15]);
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
        // Edges never count
        assert!(local_maxima(&[3.0, 2.0, 1.0]).is_empty());
    }

    #[test]
    fn test_plateau_resolves_to_midpoint() {
        let values = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&values), vec![2]);
        // Plateau running into the end is not a peak
        assert!(local_maxima(&[0.0, 1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_height_floor() {
        let values = [0.0, 0.3, 0.0, 0.5, 0.0];
        assert_eq!(find_peaks(&values, 0.4, 1), vec![3]);
    }

    #[test]
    fn test_height_floor_is_inclusive() {
        assert_eq!(find_peaks(&[0.0, 0.4, 0.0], 0.4, 15), vec![1]);
        assert!(find_peaks(&[0.0, 0.399, 0.0], 0.4, 15).is_empty());
    }

    #[test]
    fn test_distance_keeps_higher_peak() {
        // 7 and 15 are eight samples apart
        assert_eq!(find_peaks(&TWO_REPS, 0.4, 15), vec![15]);
        assert_eq!(find_peaks(&TWO_REPS, 0.4, 9), vec![15]);
        assert_eq!(find_peaks(&TWO_REPS, 0.4, 8), vec![7, 15]);
    }

    #[test]
    fn test_two_reps_when_far_enough_apart() {
        let summary = detector(8).detect(&SpeedTrace::from_meters_per_second(TWO_REPS.to_vec()));
        assert_eq!(summary.rep_count(), 2);
        assert_eq!(summary.peaks, vec![7, 15]);
        assert!(summary.peaks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(summary.peaks.len(), summary.widths.len());
    }

    #[test]
    fn test_default_distance_merges_close_reps() {
        let summary =
            RepDetector::default().detect(&SpeedTrace::from_meters_per_second(TWO_REPS.to_vec()));
        assert_eq!(summary.peaks, vec![15]);
        assert_eq!(summary.widths.len(), 1);
    }

    #[test]
    fn test_prominence_bases() {
        let prom = prominence(&TWO_REPS, 15);
        assert_relative_eq!(prom.value, 1.5);
        assert_eq!(prom.left_base, 12);
        assert_eq!(prom.right_base, 18);

        let prom = prominence(&TWO_REPS, 7);
        assert_relative_eq!(prom.value, 1.3);
        assert_eq!(prom.left_base, 3);
        assert_eq!(prom.right_base, 11);
    }

    #[test]
    fn test_prominence_against_higher_neighbour() {
        // The left search stops at the taller 2.0, so the base there is 0.5
        let values = [0.0, 2.0, 0.5, 1.0, 0.0];
        let prom = prominence(&values, 3);
        assert_relative_eq!(prom.value, 0.5);
        assert_eq!(prom.left_base, 2);
    }

    #[test]
    fn test_half_prominence_widths() {
        let widths = peak_widths(&TWO_REPS, &[7, 15], 0.5);

        assert_relative_eq!(widths[0].height, 0.65, epsilon = 1e-12);
        assert_relative_eq!(widths[0].left_ip, 5.375, epsilon = 1e-12);
        assert_relative_eq!(widths[0].right_ip, 8.625, epsilon = 1e-12);
        assert_relative_eq!(widths[0].width, 3.25, epsilon = 1e-12);

        assert_relative_eq!(widths[1].height, 0.75, epsilon = 1e-12);
        assert_relative_eq!(widths[1].left_ip, 14.0 + 0.15 / 0.9, epsilon = 1e-12);
        assert_relative_eq!(widths[1].right_ip, 17.0 - 0.55 / 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_width() {
        let values = [0.0, 1.0, 2.0, 1.0, 0.0];
        let widths = peak_widths(&values, &[2], 0.5);
        assert_relative_eq!(widths[0].width, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_detect_is_pure() {
        let trace = SpeedTrace::from_meters_per_second(TWO_REPS.to_vec());
        let det = detector(8);
        assert_eq!(det.detect(&trace), det.detect(&trace));
    }

    #[test]
    fn test_flat_or_empty_trace() {
        let det = RepDetector::default();
        assert_eq!(det.detect(&SpeedTrace::default()).rep_count(), 0);
        let flat = SpeedTrace::from_meters_per_second(vec![0.0; 50]);
        assert_eq!(det.detect(&flat).rep_count(), 0);
    }
}
