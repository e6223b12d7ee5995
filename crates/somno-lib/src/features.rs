use serde::{Deserialize, Serialize};
use std::fmt;

/// Named per-window features, in canonical vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKey {
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "SDNN")]
    Sdnn,
    #[serde(rename = "RMSSD")]
    Rmssd,
    #[serde(rename = "LFHF")]
    LfHf,
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "PTT")]
    Ptt,
    #[serde(rename = "PPG_LFrel")]
    PpgLfRel,
    #[serde(rename = "PPG_HFrel")]
    PpgHfRel,
    #[serde(rename = "ACT")]
    Act,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 9] = [
        FeatureKey::Hr,
        FeatureKey::Sdnn,
        FeatureKey::Rmssd,
        FeatureKey::LfHf,
        FeatureKey::Rsa,
        FeatureKey::Ptt,
        FeatureKey::PpgLfRel,
        FeatureKey::PpgHfRel,
        FeatureKey::Act,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FeatureKey::Hr => "HR",
            FeatureKey::Sdnn => "SDNN",
            FeatureKey::Rmssd => "RMSSD",
            FeatureKey::LfHf => "LFHF",
            FeatureKey::Rsa => "RSA",
            FeatureKey::Ptt => "PTT",
            FeatureKey::PpgLfRel => "PPG_LFrel",
            FeatureKey::PpgHfRel => "PPG_HFrel",
            FeatureKey::Act => "ACT",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical feature names, index-aligned with [`FeatureSet::to_vector`].
pub const FEATURE_KEYS: [&str; 9] = [
    FeatureKey::Hr.name(),
    FeatureKey::Sdnn.name(),
    FeatureKey::Rmssd.name(),
    FeatureKey::LfHf.name(),
    FeatureKey::Rsa.name(),
    FeatureKey::Ptt.name(),
    FeatureKey::PpgLfRel.name(),
    FeatureKey::PpgHfRel.name(),
    FeatureKey::Act.name(),
];

/// Feature values for one window; `None` where the window cannot support the estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(rename = "HR")]
    pub hr: Option<f64>,
    #[serde(rename = "SDNN")]
    pub sdnn: Option<f64>,
    #[serde(rename = "RMSSD")]
    pub rmssd: Option<f64>,
    #[serde(rename = "LFHF")]
    pub lf_hf: Option<f64>,
    #[serde(rename = "RSA")]
    pub rsa: Option<f64>,
    #[serde(rename = "PTT")]
    pub ptt: Option<f64>,
    #[serde(rename = "PPG_LFrel")]
    pub ppg_lf_rel: Option<f64>,
    #[serde(rename = "PPG_HFrel")]
    pub ppg_hf_rel: Option<f64>,
    #[serde(rename = "ACT")]
    pub act: Option<f64>,
}

impl FeatureSet {
    pub fn get(&self, key: FeatureKey) -> Option<f64> {
        match key {
            FeatureKey::Hr => self.hr,
            FeatureKey::Sdnn => self.sdnn,
            FeatureKey::Rmssd => self.rmssd,
            FeatureKey::LfHf => self.lf_hf,
            FeatureKey::Rsa => self.rsa,
            FeatureKey::Ptt => self.ptt,
            FeatureKey::PpgLfRel => self.ppg_lf_rel,
            FeatureKey::PpgHfRel => self.ppg_hf_rel,
            FeatureKey::Act => self.act,
        }
    }

    /// Values in [`FEATURE_KEYS`] order.
    pub fn to_vector(&self) -> Vec<Option<f64>> {
        FeatureKey::ALL.iter().map(|&key| self.get(key)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, Option<f64>)> + '_ {
        FeatureKey::ALL.iter().map(move |&key| (key, self.get(key)))
    }
}
