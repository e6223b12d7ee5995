use crate::{
    classify::{classify, SleepStage},
    detectors::{detect_ppg_peaks, detect_r_peaks, estimate_ppg_feet},
    error::ConfigError,
    features::{FeatureSet, FEATURE_KEYS},
    filters::{
        condition_ecg, condition_eda, condition_imu, condition_imu_magnitude, condition_ppg,
    },
    metrics::{
        activity::{activity_index, activity_index_scalar},
        hrv::{hrv_spectral, hrv_time, DEFAULT_RR_FS},
        ptt::pulse_transit_time,
        spectral::{relative_band_powers, Band},
    },
    signal::{Events, IbiSeries, ImuSamples, ImuWindow, TimeSeries},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Sampling rates and window length for one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fs_ecg: f64,
    pub fs_ppg: f64,
    pub fs_imu: f64,
    /// EDA is processed only when a rate is configured.
    pub fs_eda: Option<f64>,
    pub win_sec: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fs_ecg: 128.0,
            fs_ppg: 64.0,
            fs_imu: 32.0,
            fs_eda: Some(32.0),
            win_sec: 30.0,
        }
    }
}

fn check_rate(channel: &'static str, fs: f64) -> Result<(), ConfigError> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSampleRate { channel, fs })
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("ecg", self.fs_ecg)?;
        check_rate("ppg", self.fs_ppg)?;
        check_rate("imu", self.fs_imu)?;
        if let Some(fs) = self.fs_eda {
            check_rate("eda", fs)?;
        }
        if !(self.win_sec.is_finite() && self.win_sec > 0.0) {
            return Err(ConfigError::InvalidWindow(self.win_sec));
        }
        Ok(())
    }

    /// Expected samples per channel, `round(fs * win_sec)`.
    pub fn window_sizes(&self) -> WindowSizes {
        let samples = |fs: f64| (fs * self.win_sec).round() as usize;
        WindowSizes {
            ecg: samples(self.fs_ecg),
            ppg: samples(self.fs_ppg),
            imu: samples(self.fs_imu),
            eda: self.fs_eda.map(samples),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSizes {
    pub ecg: usize,
    pub ppg: usize,
    pub imu: usize,
    pub eda: Option<usize>,
}

/// Raw samples of one window, at the configured rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowInput {
    pub ecg: Vec<f64>,
    pub ppg: Vec<f64>,
    pub imu: ImuSamples,
    pub eda: Option<Vec<f64>>,
}

/// Everything computed for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    #[serde(rename = "Label")]
    pub label: SleepStage,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "Features")]
    pub features: FeatureSet,
    #[serde(rename = "Vector")]
    pub vector: Vec<Option<f64>>,
    #[serde(rename = "Keys")]
    pub keys: Vec<String>,
    #[serde(rename = "R_peaks")]
    pub r_peaks: Events,
    #[serde(rename = "PPG_peaks")]
    pub ppg_peaks: Events,
    #[serde(rename = "PPG_feet")]
    pub ppg_feet: Events,
    #[serde(rename = "EDA_tonic")]
    pub eda_tonic: Option<f64>,
}

/// Fiducial points found in one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fiducials {
    pub r_peaks: Events,
    pub ppg_peaks: Events,
    pub ppg_feet: Events,
}

/// Per-window feature extraction and staging with fixed sampling rates.
#[derive(Debug, Clone)]
pub struct SleepStagePipeline {
    config: PipelineConfig,
    sizes: WindowSizes,
    ppg_bands: [Band; 2],
}

impl SleepStagePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sizes: config.window_sizes(),
            config,
            ppg_bands: [Band::LF, Band::HF],
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn window_sizes(&self) -> WindowSizes {
        self.sizes
    }

    fn check_length(&self, channel: &str, actual: usize, expected: usize) {
        if actual != expected {
            warn!("{channel} window has {actual} samples, expected {expected}");
        }
    }

    /// R-peaks, pulse peaks and pulse feet of already conditioned channels.
    pub fn fiducials(&self, ecg: &TimeSeries, ppg: &TimeSeries) -> Fiducials {
        Fiducials {
            r_peaks: detect_r_peaks(ecg),
            ppg_peaks: detect_ppg_peaks(ppg),
            ppg_feet: estimate_ppg_feet(ppg),
        }
    }

    /// High-pass the accelerometer channel(s) and reduce them to the activity index.
    pub fn activity(&self, imu: &ImuSamples) -> Option<f64> {
        match imu {
            ImuSamples::Triaxial(samples) => {
                let window = ImuWindow::new(self.config.fs_imu, samples.clone());
                activity_index(&condition_imu(&window))
            }
            ImuSamples::Magnitude(samples) => {
                let series = TimeSeries::new(self.config.fs_imu, samples.clone());
                activity_index_scalar(&condition_imu_magnitude(&series).data)
            }
        }
    }

    /// Feature set from the conditioned PPG, the activity index and the fiducials.
    pub fn features(
        &self,
        ppg: &TimeSeries,
        act: Option<f64>,
        fiducials: &Fiducials,
    ) -> FeatureSet {
        let ibi = IbiSeries::from_events(&fiducials.r_peaks, self.config.fs_ecg);
        let time = hrv_time(&ibi);
        let spectral = hrv_spectral(&ibi, DEFAULT_RR_FS);
        let rel = relative_band_powers(&ppg.data, ppg.fs, &self.ppg_bands);
        FeatureSet {
            hr: time.hr,
            sdnn: time.sdnn,
            rmssd: time.rmssd,
            lf_hf: spectral.lf_hf,
            rsa: spectral.rsa,
            ptt: pulse_transit_time(
                &fiducials.r_peaks,
                self.config.fs_ecg,
                &fiducials.ppg_feet,
                self.config.fs_ppg,
            ),
            ppg_lf_rel: rel.first().copied(),
            ppg_hf_rel: rel.get(1).copied(),
            act,
        }
    }

    fn eda_tonic(&self, eda: Option<&[f64]>) -> Option<f64> {
        let data = eda?;
        let Some(fs) = self.config.fs_eda else {
            warn!("EDA samples supplied without an EDA sampling rate; ignoring");
            return None;
        };
        if let Some(expected) = self.sizes.eda {
            self.check_length("eda", data.len(), expected);
        }
        let tonic = condition_eda(&TimeSeries::new(fs, data.to_vec()));
        if tonic.is_empty() {
            return None;
        }
        Some(tonic.data.iter().sum::<f64>() / tonic.len() as f64)
    }

    pub fn process_window(&self, input: &WindowInput) -> WindowResult {
        self.check_length("ecg", input.ecg.len(), self.sizes.ecg);
        self.check_length("ppg", input.ppg.len(), self.sizes.ppg);
        self.check_length("imu", input.imu.len(), self.sizes.imu);

        let ecg = condition_ecg(&TimeSeries::new(self.config.fs_ecg, input.ecg.clone()));
        let ppg = condition_ppg(&TimeSeries::new(self.config.fs_ppg, input.ppg.clone()));

        let fiducials = self.fiducials(&ecg, &ppg);
        let features = self.features(&ppg, self.activity(&input.imu), &fiducials);
        let (label, reason) = classify(&features);
        debug!(
            "window: {} R-peaks, {} pulse peaks, {} feet -> {label} ({reason})",
            fiducials.r_peaks.len(),
            fiducials.ppg_peaks.len(),
            fiducials.ppg_feet.len()
        );

        WindowResult {
            label,
            reason,
            vector: features.to_vector(),
            keys: FEATURE_KEYS.iter().map(|k| k.to_string()).collect(),
            features,
            r_peaks: fiducials.r_peaks,
            ppg_peaks: fiducials.ppg_peaks,
            ppg_feet: fiducials.ppg_feet,
            eda_tonic: self.eda_tonic(input.eda.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> PipelineConfig {
        PipelineConfig {
            win_sec: 10.0,
            ..PipelineConfig::default()
        }
    }

    fn zeros(config: &PipelineConfig) -> WindowInput {
        let sizes = config.window_sizes();
        WindowInput {
            ecg: vec![0.0; sizes.ecg],
            ppg: vec![0.0; sizes.ppg],
            imu: vec![[0.0; 3]; sizes.imu].into(),
            eda: None,
        }
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        let sizes = cfg.window_sizes();
        assert_eq!((sizes.ecg, sizes.ppg, sizes.imu), (3840, 1920, 960));
        assert_eq!(sizes.eda, Some(960));
    }

    #[test]
    fn window_sizes_round_to_nearest_sample() {
        let cfg = PipelineConfig {
            fs_ecg: 250.0,
            win_sec: 0.999,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.window_sizes().ecg, 250);
    }

    #[test]
    fn invalid_rates_and_windows_are_rejected() {
        let cfg = PipelineConfig {
            fs_ppg: 0.0,
            ..PipelineConfig::default()
        };
        assert_eq!(
            SleepStagePipeline::new(cfg).unwrap_err(),
            ConfigError::InvalidSampleRate {
                channel: "ppg",
                fs: 0.0
            }
        );
        let cfg = PipelineConfig {
            fs_eda: Some(f64::NAN),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidSampleRate { channel: "eda", .. })
        ));
        let cfg = PipelineConfig {
            win_sec: -1.0,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidWindow(-1.0)));
    }

    #[test]
    fn config_fields_default_when_absent() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"win_sec": 60.0}"#).unwrap();
        assert_eq!(cfg.win_sec, 60.0);
        assert_eq!(cfg.fs_ecg, 128.0);
        assert_eq!(cfg.fs_eda, Some(32.0));
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SleepStagePipeline>();
    }

    #[test]
    fn silent_window_is_light_with_undefined_cardiac_features() {
        let cfg = short_config();
        let pipeline = SleepStagePipeline::new(cfg).unwrap();
        let result = pipeline.process_window(&zeros(&cfg));
        assert_eq!(result.label, SleepStage::Light);
        assert!(result.r_peaks.is_empty());
        assert_eq!(result.features.hr, None);
        assert_eq!(result.features.ptt, None);
        assert_eq!(result.features.act, Some(0.0));
        assert_eq!(result.vector.len(), result.keys.len());
        assert_eq!(result.eda_tonic, None);
    }

    #[test]
    fn mismatched_lengths_are_still_processed() {
        let cfg = short_config();
        let pipeline = SleepStagePipeline::new(cfg).unwrap();
        let mut input = zeros(&cfg);
        input.ecg.truncate(100);
        input.imu = vec![[0.0; 3]; 5].into();
        let result = pipeline.process_window(&input);
        assert_eq!(result.label, SleepStage::Light);
        assert_eq!(result.features.act, Some(0.0));
    }

    #[test]
    fn magnitude_imu_matches_triaxial_activity() {
        let cfg = short_config();
        let pipeline = SleepStagePipeline::new(cfg).unwrap();
        let n = cfg.window_sizes().imu;
        let wobble: Vec<f64> = (0..n).map(|i| 0.2 * (i as f64 * 0.9).sin()).collect();
        let triaxial: Vec<[f64; 3]> = wobble.iter().map(|&v| [0.0, v, 0.0]).collect();
        let act_vec = pipeline.activity(&triaxial.into()).unwrap();
        let act_mag = pipeline.activity(&wobble.into()).unwrap();
        assert!(act_vec > 0.1);
        assert!((act_vec - act_mag).abs() < 1e-12);

        let mut input = zeros(&cfg);
        input.imu = vec![0.0; n].into();
        assert_eq!(pipeline.process_window(&input).features.act, Some(0.0));
        assert_eq!(pipeline.activity(&ImuSamples::Magnitude(Vec::new())), None);
    }

    #[test]
    fn flat_window_serializes_positive_zero_relative_powers() {
        let cfg = short_config();
        let pipeline = SleepStagePipeline::new(cfg).unwrap();
        let result = pipeline.process_window(&zeros(&cfg));
        for value in [result.features.ppg_lf_rel, result.features.ppg_hf_rel] {
            assert!(!value.unwrap().is_sign_negative());
        }
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["Features"]["PPG_LFrel"].to_string(), "0.0");
        assert_eq!(json["Features"]["PPG_HFrel"].to_string(), "0.0");
        assert!(!serde_json::to_string(&result).unwrap().contains("-0.0"));
    }

    #[test]
    fn eda_tonic_is_mean_of_lowpassed_level() {
        let cfg = short_config();
        let pipeline = SleepStagePipeline::new(cfg).unwrap();
        let mut input = zeros(&cfg);
        input.eda = Some(vec![2.0; cfg.window_sizes().eda.unwrap()]);
        let tonic = pipeline.process_window(&input).eda_tonic.unwrap();
        assert!((tonic - 2.0).abs() < 1e-6, "tonic {tonic}");

        let no_rate = PipelineConfig {
            fs_eda: None,
            ..cfg
        };
        let pipeline = SleepStagePipeline::new(no_rate).unwrap();
        assert_eq!(pipeline.process_window(&input).eda_tonic, None);
    }
}
