use crate::{
    detectors::peaks::{detect_peaks_with_config, PeakDetectorConfig},
    filters::gradient,
    signal::{Events, TimeSeries},
};

/// Systolic peaks of a band-passed PPG window (0.4 s refractory, 80th percentile height).
pub fn detect_ppg_peaks(ppg: &TimeSeries) -> Events {
    detect_peaks_with_config(ppg, &PeakDetectorConfig::PULSE)
}

/// Pulse-wave feet approximated as the points of steepest descent of the conditioned PPG:
/// peaks of the negated first derivative, with the pulse-peak spacing and threshold.
/// A coarse onset proxy, not a physiological foot marker.
pub fn estimate_ppg_feet(ppg: &TimeSeries) -> Events {
    let slope: Vec<f64> = gradient(&ppg.data).into_iter().map(|d| -d).collect();
    detect_peaks_with_config(&TimeSeries::new(ppg.fs, slope), &PeakDetectorConfig::PULSE)
}
