//! Zero-phase Butterworth conditioning for the ECG, PPG, accelerometer and EDA channels.
//!
//! Filters are designed from the analog Butterworth prototype, moved to the requested band,
//! discretised with the pre-warped bilinear transform and applied forward then backward
//! (`filtfilt`), so the whole window must be in memory.

use crate::signal::{ImuWindow, TimeSeries};
use log::warn;
use realfft::num_complex::Complex64;
use std::f64::consts::PI;
use thiserror::Error;

/// Distance kept between a cutoff and DC / Nyquist (Hz).
pub const CUTOFF_MARGIN_HZ: f64 = 1e-3;

/// Accelerometer windows shorter than this are passed through untouched.
pub const MIN_IMU_SAMPLES: usize = 10;

/// Sampling rate of the normalised bilinear transform.
const BILINEAR_FS: f64 = 2.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("filter order must be at least 1")]
    ZeroOrder,
    #[error("sampling rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("cutoff {cutoff} Hz outside (0, {nyquist}) Hz")]
    CutoffOutOfRange { cutoff: f64, nyquist: f64 },
    #[error("band edges must satisfy low < high, got {low}..{high} Hz")]
    EmptyBand { low: f64, high: f64 },
    #[error("filter has no steady state for its initial conditions")]
    Singular,
}

/// Pass band of a Butterworth design, in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterBand {
    Lowpass(f64),
    Highpass(f64),
    Bandpass(f64, f64),
}

/// Transfer-function coefficients with `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    pub fn order(&self) -> usize {
        self.a.len().saturating_sub(1)
    }

    /// Samples of odd extension added on each side by [`filtfilt`].
    pub fn pad_len(&self) -> usize {
        3 * self.a.len().max(self.b.len())
    }
}

/// Design a digital Butterworth filter.
pub fn butterworth(
    order: usize,
    band: FilterBand,
    fs: f64,
) -> Result<FilterCoefficients, FilterError> {
    if order == 0 {
        return Err(FilterError::ZeroOrder);
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(FilterError::InvalidSampleRate(fs));
    }
    let nyquist = fs / 2.0;
    let check = |cutoff: f64| {
        if cutoff > 0.0 && cutoff < nyquist {
            Ok(cutoff)
        } else {
            Err(FilterError::CutoffOutOfRange { cutoff, nyquist })
        }
    };
    let warp = |cutoff: f64| 2.0 * BILINEAR_FS * (PI * cutoff / fs).tan();

    let prototype = prototype_poles(order);
    let (zeros, poles, gain) = match band {
        FilterBand::Lowpass(fc) => to_lowpass(&prototype, warp(check(fc)?)),
        FilterBand::Highpass(fc) => to_highpass(&prototype, warp(check(fc)?)),
        FilterBand::Bandpass(low, high) => {
            let (low, high) = (check(low)?, check(high)?);
            if low >= high {
                return Err(FilterError::EmptyBand { low, high });
            }
            to_bandpass(&prototype, warp(low), warp(high))
        }
    };
    let (zeros, poles, gain) = bilinear(&zeros, &poles, gain);

    let b = expand_roots(&zeros).iter().map(|c| c.re * gain).collect();
    let a = expand_roots(&poles).iter().map(|c| c.re).collect();
    Ok(FilterCoefficients { b, a })
}

fn prototype_poles(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|m| {
            let k = 2.0 * m as f64 - n + 1.0;
            -Complex64::new(0.0, PI * k / (2.0 * n)).exp()
        })
        .collect()
}

type Zpk = (Vec<Complex64>, Vec<Complex64>, f64);

fn to_lowpass(poles: &[Complex64], wo: f64) -> Zpk {
    let gain = wo.powi(poles.len() as i32);
    (Vec::new(), poles.iter().map(|&p| p * wo).collect(), gain)
}

fn to_highpass(poles: &[Complex64], wo: f64) -> Zpk {
    let denom: Complex64 = poles.iter().map(|&p| -p).product();
    let gain = (Complex64::new(1.0, 0.0) / denom).re;
    let zeros = vec![Complex64::new(0.0, 0.0); poles.len()];
    let poles = poles.iter().map(|&p| Complex64::new(wo, 0.0) / p).collect();
    (zeros, poles, gain)
}

fn to_bandpass(poles: &[Complex64], w_low: f64, w_high: f64) -> Zpk {
    let bw = w_high - w_low;
    let wo2 = Complex64::new(w_low * w_high, 0.0);
    let scaled: Vec<Complex64> = poles.iter().map(|&p| p * (bw / 2.0)).collect();
    let mut out = Vec::with_capacity(2 * poles.len());
    out.extend(scaled.iter().map(|&p| p + (p * p - wo2).sqrt()));
    out.extend(scaled.iter().map(|&p| p - (p * p - wo2).sqrt()));
    let zeros = vec![Complex64::new(0.0, 0.0); poles.len()];
    (zeros, out, bw.powi(poles.len() as i32))
}

fn bilinear(zeros: &[Complex64], poles: &[Complex64], gain: f64) -> Zpk {
    let fs2 = Complex64::new(2.0 * BILINEAR_FS, 0.0);
    let degree = poles.len() - zeros.len();
    let mut zeros_z: Vec<Complex64> = zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    zeros_z.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let poles_z = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let num: Complex64 = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|&p| fs2 - p).product();
    (zeros_z, poles_z, gain * (num / den).re)
}

/// Monic polynomial coefficients (highest power first) from its roots.
fn expand_roots(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Direct-form II transposed filter pass starting from state `zi`.
fn lfilter(coeffs: &FilterCoefficients, x: &[f64], zi: &[f64]) -> Vec<f64> {
    let (b, a) = (&coeffs.b, &coeffs.a);
    let n = a.len();
    let mut z = zi.to_vec();
    let mut y = Vec::with_capacity(x.len());
    for &sample in x {
        let out = b[0] * sample + z.first().copied().unwrap_or(0.0);
        for i in 0..n.saturating_sub(2) {
            z[i] = b[i + 1] * sample + z[i + 1] - a[i + 1] * out;
        }
        if n >= 2 {
            z[n - 2] = b[n - 1] * sample - a[n - 1] * out;
        }
        y.push(out);
    }
    y
}

/// Steady-state filter state for a unit step input.
fn lfilter_zi(coeffs: &FilterCoefficients) -> Result<Vec<f64>, FilterError> {
    let (b, a) = (&coeffs.b, &coeffs.a);
    let m = a.len() - 1;
    // (I - companion(a)^T) zi = b[1:] - a[1:] * b[0]
    let mut system: Vec<Vec<f64>> = (0..m)
        .map(|i| {
            let mut row = vec![0.0; m + 1];
            row[i] = 1.0;
            row[0] += a[i + 1];
            if i + 1 < m {
                row[i + 1] -= 1.0;
            }
            row[m] = b[i + 1] - a[i + 1] * b[0];
            row
        })
        .collect();
    solve_in_place(&mut system)
}

/// Gaussian elimination with partial pivoting on an augmented `m × (m + 1)` matrix.
fn solve_in_place(rows: &mut [Vec<f64>]) -> Result<Vec<f64>, FilterError> {
    let m = rows.len();
    for col in 0..m {
        let pivot = (col..m)
            .max_by(|&i, &j| rows[i][col].abs().total_cmp(&rows[j][col].abs()))
            .ok_or(FilterError::Singular)?;
        if rows[pivot][col].abs() < f64::EPSILON {
            return Err(FilterError::Singular);
        }
        rows.swap(col, pivot);
        for r in (col + 1)..m {
            let factor = rows[r][col] / rows[col][col];
            for c in col..=m {
                rows[r][c] -= factor * rows[col][c];
            }
        }
    }
    let mut x = vec![0.0; m];
    for r in (0..m).rev() {
        let tail: f64 = ((r + 1)..m).map(|c| rows[r][c] * x[c]).sum();
        x[r] = (rows[r][m] - tail) / rows[r][r];
    }
    Ok(x)
}

/// Zero-phase forward-backward filtering with odd extension at both ends.
///
/// Inputs no longer than [`FilterCoefficients::pad_len`] are returned unchanged.
pub fn filtfilt(coeffs: &FilterCoefficients, x: &[f64]) -> Result<Vec<f64>, FilterError> {
    let pad = coeffs.pad_len();
    if x.len() <= pad {
        return Ok(x.to_vec());
    }
    let zi = lfilter_zi(coeffs)?;
    let n = x.len();

    let mut ext = Vec::with_capacity(n + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * x[0] - x[i]));
    ext.extend_from_slice(x);
    ext.extend((0..pad).map(|i| 2.0 * x[n - 1] - x[n - 2 - i]));

    let start: Vec<f64> = zi.iter().map(|z| z * ext[0]).collect();
    let mut y = lfilter(coeffs, &ext, &start);
    y.reverse();
    let start: Vec<f64> = zi.iter().map(|z| z * y[0]).collect();
    let mut y = lfilter(coeffs, &y, &start);
    y.reverse();
    Ok(y[pad..pad + n].to_vec())
}

fn clamp_cutoff(cutoff: f64, fs: f64) -> f64 {
    cutoff.max(CUTOFF_MARGIN_HZ).min(fs / 2.0 - CUTOFF_MARGIN_HZ)
}

fn design_and_apply(data: &[f64], fs: f64, order: usize, band: FilterBand) -> Vec<f64> {
    match butterworth(order, band, fs).and_then(|coeffs| filtfilt(&coeffs, data)) {
        Ok(filtered) => filtered,
        Err(err) => {
            warn!("{band:?} at {fs} Hz left unfiltered: {err}");
            data.to_vec()
        }
    }
}

pub fn bandpass(data: &[f64], fs: f64, low: f64, high: f64, order: usize) -> Vec<f64> {
    let band = FilterBand::Bandpass(clamp_cutoff(low, fs), clamp_cutoff(high, fs));
    design_and_apply(data, fs, order, band)
}

pub fn lowpass(data: &[f64], fs: f64, cutoff: f64, order: usize) -> Vec<f64> {
    design_and_apply(data, fs, order, FilterBand::Lowpass(clamp_cutoff(cutoff, fs)))
}

pub fn highpass(data: &[f64], fs: f64, cutoff: f64, order: usize) -> Vec<f64> {
    design_and_apply(data, fs, order, FilterBand::Highpass(clamp_cutoff(cutoff, fs)))
}

/// QRS emphasis band, 5–30 Hz.
pub fn condition_ecg(ts: &TimeSeries) -> TimeSeries {
    TimeSeries::new(ts.fs, bandpass(&ts.data, ts.fs, 5.0, 30.0, 3))
}

/// Pulse-wave band, 0.5–8 Hz.
pub fn condition_ppg(ts: &TimeSeries) -> TimeSeries {
    TimeSeries::new(ts.fs, bandpass(&ts.data, ts.fs, 0.5, 8.0, 3))
}

/// Removes gravity / DC bias from each axis independently (0.2 Hz high-pass).
pub fn condition_imu(imu: &ImuWindow) -> ImuWindow {
    if imu.len() < MIN_IMU_SAMPLES {
        return imu.clone();
    }
    let [x, y, z] = imu.axes();
    let filtered = [
        highpass(&x, imu.fs, 0.2, 2),
        highpass(&y, imu.fs, 0.2, 2),
        highpass(&z, imu.fs, 0.2, 2),
    ];
    ImuWindow::from_axes(imu.fs, &filtered)
}

/// Same 0.2 Hz high-pass for a single combined-magnitude accelerometer channel.
pub fn condition_imu_magnitude(ts: &TimeSeries) -> TimeSeries {
    if ts.len() < MIN_IMU_SAMPLES {
        return ts.clone();
    }
    TimeSeries::new(ts.fs, highpass(&ts.data, ts.fs, 0.2, 2))
}

/// Tonic skin-conductance level (2 Hz low-pass).
pub fn condition_eda(ts: &TimeSeries) -> TimeSeries {
    TimeSeries::new(ts.fs, lowpass(&ts.data, ts.fs, 2.0, 2))
}

/// First derivative with central differences inside and one-sided differences at the edges.
pub fn gradient(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut out = Vec::with_capacity(n);
    out.push(data[1] - data[0]);
    for i in 1..n - 1 {
        out.push((data[i + 1] - data[i - 1]) / 2.0);
    }
    out.push(data[n - 1] - data[n - 2]);
    out
}
