//! Seeded synthetic ECG, PPG and accelerometer windows for each sleep stage.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Normal, NormalError, StandardNormal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("invalid synthesis config: {0}")]
    InvalidConfig(String),
    #[error("interval noise: {0}")]
    Noise(#[from] NormalError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthStage {
    Deep,
    Light,
    Rem,
    Wake,
}

impl SynthStage {
    pub const ALL: [SynthStage; 4] = [
        SynthStage::Deep,
        SynthStage::Light,
        SynthStage::Rem,
        SynthStage::Wake,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SynthStage::Deep => "deep",
            SynthStage::Light => "light",
            SynthStage::Rem => "rem",
            SynthStage::Wake => "wake",
        }
    }

    fn params(self) -> StageParams {
        match self {
            SynthStage::Deep => StageParams {
                hr_bpm: 55.0,
                ptt_s: 0.30,
                sdnn_target: 0.40,
                lf_amp: 0.06,
                hf_amp: 0.03,
                act_level: 0.01,
                seed_offset: 0,
            },
            SynthStage::Light => StageParams {
                hr_bpm: 75.0,
                ptt_s: 0.25,
                sdnn_target: 0.10,
                lf_amp: 0.03,
                hf_amp: 0.02,
                act_level: 0.08,
                seed_offset: 1,
            },
            SynthStage::Rem => StageParams {
                hr_bpm: 85.0,
                ptt_s: 0.22,
                sdnn_target: 0.07,
                lf_amp: 0.02,
                hf_amp: 0.03,
                act_level: 0.05,
                seed_offset: 2,
            },
            SynthStage::Wake => StageParams {
                hr_bpm: 100.0,
                ptt_s: 0.20,
                sdnn_target: 0.05,
                lf_amp: 0.01,
                hf_amp: 0.02,
                act_level: 0.30,
                seed_offset: 3,
            },
        }
    }
}

impl fmt::Display for SynthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SynthStage {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        SynthStage::ALL
            .into_iter()
            .find(|stage| stage.name() == lower)
            .ok_or_else(|| SynthError::UnknownStage(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
struct StageParams {
    hr_bpm: f64,
    ptt_s: f64,
    sdnn_target: f64,
    lf_amp: f64,
    hf_amp: f64,
    act_level: f64,
    seed_offset: u64,
}

/// Interval modulation frequencies (Hz).
const LF_HZ: f64 = 0.08;
const HF_HZ: f64 = 0.25;
const RR_MIN_S: f64 = 0.3;
const RR_MAX_S: f64 = 2.0;
const ECG_NOISE: f64 = 0.005;
const PPG_NOISE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub fs_ecg: f64,
    pub fs_ppg: f64,
    pub fs_imu: f64,
    pub win_sec: f64,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            fs_ecg: 128.0,
            fs_ppg: 64.0,
            fs_imu: 32.0,
            win_sec: 60.0,
            seed: 42,
        }
    }
}

impl SynthConfig {
    fn validate(&self) -> Result<(), SynthError> {
        for (name, v) in [
            ("fs_ecg", self.fs_ecg),
            ("fs_ppg", self.fs_ppg),
            ("fs_imu", self.fs_imu),
            ("win_sec", self.win_sec),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SynthError::InvalidConfig(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }
        Ok(())
    }

    fn samples(&self, fs: f64) -> usize {
        (fs * self.win_sec).round() as usize
    }
}

/// Nominal values the window was generated with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    #[serde(rename = "HR")]
    pub hr: f64,
    #[serde(rename = "PTT")]
    pub ptt: f64,
    #[serde(rename = "ACT")]
    pub act: f64,
}

#[derive(Debug, Clone)]
pub struct SynthWindow {
    pub stage: SynthStage,
    pub ecg: Vec<f64>,
    pub ppg: Vec<f64>,
    pub imu: Vec<[f64; 3]>,
    pub r_peaks: Vec<usize>,
    pub truth: GroundTruth,
}

/// Beat intervals with mean `60 / hr_bpm`, sinusoidal LF/HF modulation and Gaussian
/// jitter, clipped to 0.3..=2.0 s.
pub fn synth_rr_series(
    hr_bpm: f64,
    win_sec: f64,
    sdnn_target: f64,
    lf_amp: f64,
    hf_amp: f64,
    rng: &mut StdRng,
) -> Result<Vec<f64>, SynthError> {
    let n_beats = (hr_bpm / 60.0 * win_sec).round() as usize;
    let base_rr = 60.0 / hr_bpm;
    let jitter = Normal::new(0.0, sdnn_target * 0.25)?;
    Ok((0..n_beats)
        .map(|i| {
            let t = i as f64 * win_sec / n_beats as f64;
            let rr = base_rr
                + lf_amp * (2.0 * PI * LF_HZ * t).sin()
                + hf_amp * (2.0 * PI * HF_HZ * t).sin()
                + rng.sample(jitter);
            rr.clamp(RR_MIN_S, RR_MAX_S)
        })
        .collect())
}

/// Beat sample indices from intervals, starting at 0; duplicates collapse.
pub fn rr_to_peaks(rr: &[f64], fs: f64) -> Vec<usize> {
    let Some(&first) = rr.first() else {
        return Vec::new();
    };
    let mut elapsed = 0.0;
    let mut peaks: Vec<usize> = rr
        .iter()
        .map(|v| {
            elapsed += v;
            ((elapsed - first) * fs).round().max(0.0) as usize
        })
        .collect();
    peaks.dedup();
    peaks
}

fn standard_normal(rng: &mut StdRng) -> f64 {
    rng.sample(StandardNormal)
}

fn synth_ecg(r_peaks: &[usize], fs: f64, n: usize, rng: &mut StdRng) -> Vec<f64> {
    let width = (0.02 * fs) as usize;
    let sigma = 0.007 * fs;
    let kernel: Vec<f64> = (0..=2 * width)
        .map(|k| {
            let offset = k as f64 - width as f64;
            (-0.5 * (offset / sigma).powi(2)).exp()
        })
        .collect();

    let mut ecg = vec![0.0; n];
    for &rp in r_peaks {
        if rp < width || rp + width >= n {
            continue;
        }
        for (sample, k) in ecg[rp - width..=rp + width].iter_mut().zip(&kernel) {
            *sample += k;
        }
    }
    for sample in ecg.iter_mut() {
        *sample += ECG_NOISE * standard_normal(rng);
    }
    ecg
}

fn synth_ppg(feet: &[usize], fs: f64, n: usize, rng: &mut StdRng) -> Vec<f64> {
    let tail = (0.30 * fs) as usize;
    let decay = 0.08 * fs;
    let mut ppg = vec![0.0; n];
    for &ft in feet {
        if ft >= n {
            continue;
        }
        let end = n.min(ft + tail);
        for (i, sample) in ppg[ft..end].iter_mut().enumerate() {
            *sample += (-(i as f64) / decay).exp();
        }
    }
    let mean = ppg.iter().sum::<f64>() / n.max(1) as f64;
    let std = (ppg.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n.max(1) as f64).sqrt();
    for sample in ppg.iter_mut() {
        *sample = (*sample - mean) / (std + 1e-8) + PPG_NOISE * standard_normal(rng);
    }
    ppg
}

/// Generate one window for the named stage (`deep`, `light`, `rem`, `wake`).
pub fn synth_window(stage: &str, cfg: &SynthConfig) -> Result<SynthWindow, SynthError> {
    synth_stage_window(stage.parse()?, cfg)
}

pub fn synth_stage_window(stage: SynthStage, cfg: &SynthConfig) -> Result<SynthWindow, SynthError> {
    cfg.validate()?;
    let p = stage.params();

    let mut rr_rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(p.seed_offset));
    let rr = synth_rr_series(
        p.hr_bpm,
        cfg.win_sec,
        p.sdnn_target,
        p.lf_amp,
        p.hf_amp,
        &mut rr_rng,
    )?;
    let r_peaks = rr_to_peaks(&rr, cfg.fs_ecg);

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let ecg = synth_ecg(&r_peaks, cfg.fs_ecg, cfg.samples(cfg.fs_ecg), &mut rng);

    let delay = (p.ptt_s * cfg.fs_ppg).round() as usize;
    let feet: Vec<usize> = r_peaks
        .iter()
        .map(|&rp| (rp as f64 / cfg.fs_ecg * cfg.fs_ppg) as usize + delay)
        .collect();
    let ppg = synth_ppg(&feet, cfg.fs_ppg, cfg.samples(cfg.fs_ppg), &mut rng);

    let imu = (0..cfg.samples(cfg.fs_imu))
        .map(|_| {
            [
                p.act_level * standard_normal(&mut rng),
                p.act_level * standard_normal(&mut rng),
                p.act_level * standard_normal(&mut rng),
            ]
        })
        .collect();

    Ok(SynthWindow {
        stage,
        ecg,
        ppg,
        imu,
        r_peaks,
        truth: GroundTruth {
            hr: p.hr_bpm,
            ptt: p.ptt_s,
            act: p.act_level,
        },
    })
}
