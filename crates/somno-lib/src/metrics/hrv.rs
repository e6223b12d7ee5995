use crate::{
    metrics::spectral::{welch_psd, Band, MAX_WELCH_SEGMENT},
    signal::IbiSeries,
};
use serde::{Deserialize, Serialize};

/// Fewest intervals accepted for a spectral HRV estimate.
pub const MIN_SPECTRAL_INTERVALS: usize = 16;

/// Rate at which the interval series is assumed to be regularly sampled (Hz).
pub const DEFAULT_RR_FS: f64 = 4.0;

/// Centred series with every |value| at or below this are treated as flat.
const FLAT_TOLERANCE: f64 = 1e-8;

/// Time-domain HRV summary; `None` marks values the window cannot support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvTime {
    pub n: usize,
    pub hr: Option<f64>,
    pub sdnn: Option<f64>,
    pub rmssd: Option<f64>,
}

/// Frequency-domain HRV summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvSpectral {
    pub lf: Option<f64>,
    pub hf: Option<f64>,
    pub lf_hf: Option<f64>,
    pub rsa: Option<f64>,
}

pub fn hrv_time(ibi: &IbiSeries) -> HrvTime {
    HrvTime {
        n: ibi.len(),
        hr: heart_rate(ibi),
        sdnn: sdnn(ibi),
        rmssd: rmssd(ibi),
    }
}

/// LF and HF power of the interval series plus their ratio, from a single PSD.
///
/// `None` everywhere below [`MIN_SPECTRAL_INTERVALS`]; the ratio is also `None` for a flat
/// series or when the HF band holds no power.
pub fn hrv_spectral(ibi: &IbiSeries, fs_rr: f64) -> HrvSpectral {
    let Some(rr) = centred(ibi) else {
        return HrvSpectral::default();
    };
    let Some((lf, hf)) = band_powers(&rr, fs_rr) else {
        return HrvSpectral::default();
    };
    let flat = rr.iter().all(|v| v.abs() <= FLAT_TOLERANCE);
    HrvSpectral {
        lf: Some(lf),
        hf: Some(hf),
        lf_hf: (!flat && hf > 0.0).then(|| lf / hf),
        rsa: Some(hf),
    }
}

pub fn heart_rate(ibi: &IbiSeries) -> Option<f64> {
    ibi.mean().map(|m| 60.0 / m)
}

/// Population standard deviation of the intervals.
pub fn sdnn(ibi: &IbiSeries) -> Option<f64> {
    let mean = ibi.mean()?;
    let var = ibi.ibi.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / ibi.len() as f64;
    Some(var.sqrt())
}

/// Root mean square of successive interval differences.
pub fn rmssd(ibi: &IbiSeries) -> Option<f64> {
    if ibi.len() < 2 {
        return None;
    }
    let diffs = ibi.ibi.windows(2).map(|w| (w[1] - w[0]).powi(2));
    Some((diffs.sum::<f64>() / (ibi.len() - 1) as f64).sqrt())
}

fn centred(ibi: &IbiSeries) -> Option<Vec<f64>> {
    if ibi.len() < MIN_SPECTRAL_INTERVALS {
        return None;
    }
    let mean = ibi.mean()?;
    Some(ibi.ibi.iter().map(|x| x - mean).collect())
}

/// LF and HF power of a centred interval series, treated as if sampled uniformly at `fs_rr`.
///
/// No resampling onto a time grid takes place; this is an approximation of the beat
/// spectrum that holds while intervals stay close to `1 / fs_rr` apart in index.
fn band_powers(rr: &[f64], fs_rr: f64) -> Option<(f64, f64)> {
    let psd = welch_psd(rr, fs_rr, MAX_WELCH_SEGMENT.min(rr.len()))?;
    Some((psd.band_power(Band::LF), psd.band_power(Band::HF)))
}

/// LF/HF ratio. `None` for short or flat series, or when the HF band holds no power.
pub fn lf_hf_ratio(ibi: &IbiSeries, fs_rr: f64) -> Option<f64> {
    hrv_spectral(ibi, fs_rr).lf_hf
}

/// HF-band power of the interval series, a proxy for respiratory sinus arrhythmia.
pub fn rsa_power(ibi: &IbiSeries, fs_rr: f64) -> Option<f64> {
    hrv_spectral(ibi, fs_rr).rsa
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Events;
    use std::f64::consts::PI;

    fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
        let tol = expected.abs().max(1.0) * rel_tol;
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    fn ibi_series() -> IbiSeries {
        let data = [
            0.82, 0.78, 0.80, 0.79, 0.83, 0.77, 0.84, 0.88, 0.86, 0.81, 0.79, 0.82, 0.85, 0.78,
            0.80, 0.79, 0.83, 0.84, 0.82, 0.81,
        ];
        IbiSeries { ibi: data.to_vec() }
    }

    /// Intervals modulated at `freq` cycles per `1 / fs_rr` seconds of index.
    fn modulated(n: usize, freq: f64, depth: f64) -> IbiSeries {
        let ibi = (0..n)
            .map(|i| 0.9 + depth * (2.0 * PI * freq * i as f64 / DEFAULT_RR_FS).sin())
            .collect();
        IbiSeries { ibi }
    }

    #[test]
    fn heart_rate_is_sixty_over_mean_interval() {
        let ibi = ibi_series();
        let mean = ibi.ibi.iter().sum::<f64>() / ibi.len() as f64;
        assert_eq!(heart_rate(&ibi), Some(60.0 / mean));
        let steady = IbiSeries::from_events(&Events::from_indices(vec![0, 128, 256]), 128.0);
        assert_close(heart_rate(&steady).unwrap(), 60.0, 1e-12);
    }

    #[test]
    fn time_domain_metrics_match_hand_computation() {
        let ibi = IbiSeries {
            ibi: vec![0.8, 1.0, 0.9],
        };
        let time = hrv_time(&ibi);
        assert_eq!(time.n, 3);
        assert_close(time.sdnn.unwrap(), (0.02f64 / 3.0).sqrt(), 1e-12);
        assert_close(time.rmssd.unwrap(), (0.05f64 / 2.0).sqrt(), 1e-12);
    }

    #[test]
    fn missing_values_follow_interval_count() {
        let empty = IbiSeries::default();
        assert_eq!(hrv_time(&empty).hr, None);
        assert_eq!(sdnn(&empty), None);

        let single = IbiSeries { ibi: vec![0.9] };
        assert!(heart_rate(&single).is_some());
        assert_eq!(sdnn(&single), Some(0.0));
        assert_eq!(rmssd(&single), None);

        let pair = IbiSeries {
            ibi: vec![0.9, 0.9],
        };
        assert_eq!(rmssd(&pair), Some(0.0));
    }

    #[test]
    fn spectral_metrics_need_sixteen_intervals() {
        let short = modulated(MIN_SPECTRAL_INTERVALS - 1, 0.25, 0.05);
        assert_eq!(lf_hf_ratio(&short, DEFAULT_RR_FS), None);
        assert_eq!(rsa_power(&short, DEFAULT_RR_FS), None);
        let spectral = hrv_spectral(&short, DEFAULT_RR_FS);
        assert_eq!(spectral, HrvSpectral::default());

        let enough = ibi_series();
        assert!(rsa_power(&enough, DEFAULT_RR_FS).is_some());
    }

    #[test]
    fn flat_intervals_have_no_ratio() {
        let flat = IbiSeries {
            ibi: vec![0.75; 40],
        };
        assert_eq!(lf_hf_ratio(&flat, DEFAULT_RR_FS), None);
        assert_eq!(rsa_power(&flat, DEFAULT_RR_FS), Some(0.0));
    }

    #[test]
    fn respiratory_modulation_lands_in_hf() {
        let breathing = modulated(64, 0.25, 0.05);
        let ratio = lf_hf_ratio(&breathing, DEFAULT_RR_FS).unwrap();
        let rsa = rsa_power(&breathing, DEFAULT_RR_FS).unwrap();
        assert!(ratio < 0.1, "ratio {ratio}");
        assert!(rsa > 0.0);

        let mayer = modulated(64, 0.1, 0.05);
        let ratio = lf_hf_ratio(&mayer, DEFAULT_RR_FS).unwrap();
        assert!(ratio > 1.0, "ratio {ratio}");
    }

    #[test]
    fn spectral_summary_agrees_with_single_metrics() {
        let breathing = modulated(64, 0.25, 0.05);
        let spectral = hrv_spectral(&breathing, DEFAULT_RR_FS);
        assert_eq!(spectral.lf_hf, lf_hf_ratio(&breathing, DEFAULT_RR_FS));
        assert_eq!(spectral.rsa, rsa_power(&breathing, DEFAULT_RR_FS));
        assert_eq!(spectral.rsa, spectral.hf);
        let (lf, hf) = (spectral.lf.unwrap(), spectral.hf.unwrap());
        assert_close(spectral.lf_hf.unwrap(), lf / hf, 1e-12);
    }

    #[test]
    fn single_bin_lf_band_gives_positive_zero_ratio() {
        // 53 intervals at 4 Hz: bins 0.0755 Hz apart, only one inside LF.
        let ibi = modulated(53, 0.25, 0.05);
        let spectral = hrv_spectral(&ibi, DEFAULT_RR_FS);
        assert_eq!(spectral.lf, Some(0.0));
        assert!(!spectral.lf.unwrap().is_sign_negative());
        let ratio = spectral.lf_hf.unwrap();
        assert!(ratio == 0.0 && !ratio.is_sign_negative());
    }

    #[test]
    fn ratio_is_never_returned_without_hf_power() {
        // 16 intervals at 4 Hz give bins 0.25 Hz apart: only 0.25 Hz falls in HF,
        // so the trapezoid over a single bin is zero.
        let ibi = modulated(16, 0.5, 0.05);
        assert_eq!(lf_hf_ratio(&ibi, DEFAULT_RR_FS), None);
        assert_eq!(rsa_power(&ibi, DEFAULT_RR_FS), Some(0.0));
    }
}
