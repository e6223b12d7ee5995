use crate::signal::Events;
use serde::{Deserialize, Serialize};

/// An R-peak matched with the first pulse foot that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatPair {
    pub r_peak: usize,
    pub foot: usize,
    /// Foot time minus R-peak time (seconds), always positive.
    pub delay_s: f64,
}

/// Causal greedy pairing of R-peaks with pulse feet.
///
/// Both sequences are walked once with two cursors. A foot at or before the current R-peak
/// cannot belong to it and is skipped; otherwise the two are paired and both cursors
/// advance, so no index is ever used twice. Each index set is converted to seconds with its
/// own sampling rate.
pub fn causal_pairs(r_peaks: &Events, fs_ecg: f64, feet: &Events, fs_ppg: f64) -> Vec<BeatPair> {
    let (r, f) = (&r_peaks.indices, &feet.indices);
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < r.len() && j < f.len() {
        let r_t = r[i] as f64 / fs_ecg;
        let f_t = f[j] as f64 / fs_ppg;
        if f_t <= r_t {
            j += 1;
            continue;
        }
        pairs.push(BeatPair {
            r_peak: r[i],
            foot: f[j],
            delay_s: f_t - r_t,
        });
        i += 1;
        j += 1;
    }
    pairs
}

/// Mean pulse transit time (seconds); `None` without at least one causal pair.
pub fn pulse_transit_time(
    r_peaks: &Events,
    fs_ecg: f64,
    feet: &Events,
    fs_ppg: f64,
) -> Option<f64> {
    let pairs = causal_pairs(r_peaks, fs_ecg, feet, fs_ppg);
    if pairs.is_empty() {
        return None;
    }
    Some(pairs.iter().map(|p| p.delay_s).sum::<f64>() / pairs.len() as f64)
}
