use crate::signal::{Events, TimeSeries};
use serde::{Deserialize, Serialize};

/// Percentile with linear interpolation between closest ranks (`q` in 0..=100).
pub fn percentile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Indices of strict local maxima. Flat tops report the (rounded-down) middle of the plateau.
pub fn local_maxima(data: &[f64]) -> Vec<usize> {
    let n = data.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Local maxima at least `height` tall and at least `distance` samples apart.
///
/// Spacing is enforced greedily from the tallest peak down: every weaker peak closer than
/// `distance` to a kept one is dropped. The result is strictly increasing.
pub fn find_peaks(data: &[f64], height: f64, distance: usize) -> Vec<usize> {
    let peaks: Vec<usize> = local_maxima(data)
        .into_iter()
        .filter(|&i| data[i] >= height)
        .collect();
    let distance = distance.max(1);
    if peaks.len() < 2 || distance == 1 {
        return peaks;
    }

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| data[peaks[a]].total_cmp(&data[peaks[b]]));

    let mut keep = vec![true; peaks.len()];
    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(idx, kept)| kept.then_some(idx))
        .collect()
}

/// Refractory spacing in samples for a duration in seconds (truncated, at least one sample).
pub fn distance_samples(seconds: f64, fs: f64) -> usize {
    ((seconds * fs) as usize).max(1)
}

/// Spacing and amplitude acceptance for a percentile-thresholded peak search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDetectorConfig {
    /// Minimum distance between accepted peaks / refractory period (seconds).
    pub min_distance_s: f64,
    /// Peaks below this percentile of the window amplitude are rejected.
    pub height_percentile: f64,
}

impl PeakDetectorConfig {
    /// Cardiac R-peaks.
    pub const R_PEAK: Self = Self {
        min_distance_s: 0.3,
        height_percentile: 85.0,
    };
    /// Pulse peaks and feet.
    pub const PULSE: Self = Self {
        min_distance_s: 0.4,
        height_percentile: 80.0,
    };
}

/// Detect peaks in an already conditioned series.
pub fn detect_peaks_with_config(ts: &TimeSeries, cfg: &PeakDetectorConfig) -> Events {
    let Some(height) = percentile(&ts.data, cfg.height_percentile) else {
        return Events::default();
    };
    let distance = distance_samples(cfg.min_distance_s, ts.fs);
    Events::from_indices(find_peaks(&ts.data, height, distance))
}
