use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Triaxial accelerometer window; one `[x, y, z]` triplet per sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImuWindow {
    pub fs: f64,
    pub samples: Vec<[f64; 3]>,
}

impl ImuWindow {
    pub fn new(fs: f64, samples: Vec<[f64; 3]>) -> Self {
        Self { fs, samples }
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Split into three single-axis series.
    pub fn axes(&self) -> [Vec<f64>; 3] {
        let mut axes = [
            Vec::with_capacity(self.len()),
            Vec::with_capacity(self.len()),
            Vec::with_capacity(self.len()),
        ];
        for sample in &self.samples {
            for (axis, &value) in axes.iter_mut().zip(sample.iter()) {
                axis.push(value);
            }
        }
        axes
    }

    /// Rebuild a window from three equally long axis series.
    pub fn from_axes(fs: f64, axes: &[Vec<f64>; 3]) -> Self {
        let n = axes.iter().map(Vec::len).min().unwrap_or(0);
        let samples = (0..n).map(|i| [axes[0][i], axes[1][i], axes[2][i]]).collect();
        Self { fs, samples }
    }
}

/// Raw accelerometer samples: `[x, y, z]` triplets or an already combined magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImuSamples {
    Triaxial(Vec<[f64; 3]>),
    Magnitude(Vec<f64>),
}

impl ImuSamples {
    pub fn len(&self) -> usize {
        match self {
            ImuSamples::Triaxial(samples) => samples.len(),
            ImuSamples::Magnitude(samples) => samples.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ImuSamples {
    fn default() -> Self {
        ImuSamples::Triaxial(Vec::new())
    }
}

impl From<Vec<[f64; 3]>> for ImuSamples {
    fn from(samples: Vec<[f64; 3]>) -> Self {
        ImuSamples::Triaxial(samples)
    }
}

impl From<Vec<f64>> for ImuSamples {
    fn from(samples: Vec<f64>) -> Self {
        ImuSamples::Magnitude(samples)
    }
}

/// Point events on a timeline (e.g., R-peaks indices)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inter-beat intervals (seconds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IbiSeries {
    pub ibi: Vec<f64>,
}

impl IbiSeries {
    /// Consecutive event differences divided by `fs`; empty for fewer than two events.
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let ibi = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs)
            .collect();
        Self { ibi }
    }
    pub fn len(&self) -> usize {
        self.ibi.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ibi.is_empty()
    }
    pub fn mean(&self) -> Option<f64> {
        if self.ibi.is_empty() {
            None
        } else {
            Some(self.ibi.iter().sum::<f64>() / self.ibi.len() as f64)
        }
    }
}
