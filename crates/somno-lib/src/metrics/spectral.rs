use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Longest Welch segment used for band-power estimates.
pub const MAX_WELCH_SEGMENT: usize = 256;

/// Upper edge of the "total power" band used for relative powers (Hz).
pub const TOTAL_POWER_CEILING_HZ: f64 = 2.0;

const RELATIVE_POWER_EPS: f64 = 1e-9;

/// Closed frequency interval in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const LF: Band = Band::new(0.04, 0.15);
    pub const HF: Band = Band::new(0.15, 0.40);

    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low && freq <= self.high
    }
}

/// One-sided power spectral density.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Psd {
    pub freqs: Vec<f64>,
    pub power: Vec<f64>,
}

impl Psd {
    /// Trapezoidal integral of the bins falling inside `band`; 0 with fewer than two bins.
    pub fn band_power(&self, band: Band) -> f64 {
        let (f, p): (Vec<f64>, Vec<f64>) = self
            .freqs
            .iter()
            .zip(&self.power)
            .filter(|(f, _)| band.contains(**f))
            .map(|(f, p)| (*f, *p))
            .unzip();
        trapz(&p, &f)
    }
}

/// Trapezoidal rule over samples `y` taken at abscissae `x`.
/// Returns `+0.0` when fewer than two samples are given.
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .fold(0.0, |acc, (yw, xw)| acc + (xw[1] - xw[0]) * (yw[0] + yw[1]) / 2.0)
}

/// Periodic Hann window.
pub fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size as f64)).cos()))
        .collect()
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

/// Welch PSD: Hann segments of `nperseg` samples with 50% overlap, each segment mean-removed,
/// density scaled and averaged. `None` when fewer than two samples are available.
pub fn welch_psd(data: &[f64], fs: f64, nperseg: usize) -> Option<Psd> {
    let n = data.len();
    let nperseg = nperseg.min(n);
    if nperseg < 2 || !(fs > 0.0) {
        return None;
    }
    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let segments = (n - noverlap) / step;

    let window = hann(nperseg);
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(nperseg);
    let mut spectrum = r2c.make_output_vec();
    let bins = spectrum.len();
    let mut power = vec![0.0; bins];

    for seg in 0..segments {
        let slice = &data[seg * step..seg * step + nperseg];
        let offset = mean(slice);
        let mut frame: Vec<f64> = slice
            .iter()
            .zip(&window)
            .map(|(x, w)| (x - offset) * w)
            .collect();
        r2c.process(&mut frame, &mut spectrum).ok()?;
        for (k, val) in spectrum.iter().enumerate() {
            let one_sided = k == 0 || (nperseg % 2 == 0 && k == nperseg / 2);
            let factor = if one_sided { 1.0 } else { 2.0 };
            power[k] += factor * val.norm_sqr() * scale;
        }
    }
    for p in power.iter_mut() {
        *p /= segments as f64;
    }
    let freqs = (0..bins)
        .map(|k| k as f64 * fs / nperseg as f64)
        .collect();
    Some(Psd { freqs, power })
}

/// Integrated Welch power of the mean-removed signal inside `band`.
pub fn band_power(data: &[f64], fs: f64, band: Band) -> f64 {
    let offset = mean(data);
    let centred: Vec<f64> = data.iter().map(|x| x - offset).collect();
    welch_psd(&centred, fs, MAX_WELCH_SEGMENT.min(data.len()))
        .map(|psd| psd.band_power(band))
        .unwrap_or(0.0)
}

/// Band powers normalised by the power in `[0, min(2 Hz, Nyquist))`.
///
/// The denominator is not the sum of the requested bands, so the results do not form a
/// partition and need not add up to one.
pub fn relative_band_powers(data: &[f64], fs: f64, bands: &[Band]) -> Vec<f64> {
    let ceiling = TOTAL_POWER_CEILING_HZ.min(fs / 2.0 - 1e-3);
    let total = band_power(data, fs, Band::new(0.0, ceiling));
    bands
        .iter()
        .map(|&band| band_power(data, fs, band) / (total + RELATIVE_POWER_EPS))
        .collect()
}

/// Mean short-time power inside `band`.
///
/// Frames are `win_sec` long and overlap by `overlap_ratio` of their length. The signal is
/// mean-removed, extended by half a frame of zeros on both ends and zero-padded to a whole
/// number of frames. Returns 0 when no frequency bin falls in the band.
pub fn stft_band_power(data: &[f64], fs: f64, band: Band, win_sec: f64, overlap_ratio: f64) -> f64 {
    let nperseg = ((win_sec * fs) as usize).min(data.len());
    if nperseg < 2 {
        return 0.0;
    }
    let noverlap = ((nperseg as f64 * overlap_ratio) as usize).min(nperseg - 1);
    let step = nperseg - noverlap;

    let offset = mean(data);
    let half = nperseg / 2;
    let mut padded = vec![0.0; half];
    padded.extend(data.iter().map(|x| x - offset));
    padded.extend(std::iter::repeat(0.0).take(half));
    let extra = (step - (padded.len() - nperseg) % step) % step;
    padded.extend(std::iter::repeat(0.0).take(extra));
    let frames = (padded.len() - noverlap) / step;

    let window = hann(nperseg);
    let scale = 1.0 / window.iter().sum::<f64>();
    let in_band: Vec<usize> = (0..=nperseg / 2)
        .filter(|&k| band.contains(k as f64 * fs / nperseg as f64))
        .collect();
    if in_band.is_empty() || frames == 0 {
        return 0.0;
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(nperseg);
    let mut spectrum = r2c.make_output_vec();
    let mut total = 0.0;
    for frame_idx in 0..frames {
        let start = frame_idx * step;
        let mut frame: Vec<f64> = padded[start..start + nperseg]
            .iter()
            .zip(&window)
            .map(|(x, w)| x * w)
            .collect();
        if r2c.process(&mut frame, &mut spectrum).is_err() {
            return 0.0;
        }
        total += in_band
            .iter()
            .map(|&k| (spectrum[k] * scale).norm_sqr())
            .sum::<f64>();
    }
    total / (in_band.len() * frames) as f64
}
