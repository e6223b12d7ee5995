use crate::{
    detectors::peaks::{detect_peaks_with_config, PeakDetectorConfig},
    signal::{Events, TimeSeries},
};

/// R-peaks of a band-passed ECG window (0.3 s refractory, 85th percentile height).
pub fn detect_r_peaks(ecg: &TimeSeries) -> Events {
    detect_peaks_with_config(ecg, &PeakDetectorConfig::R_PEAK)
}
