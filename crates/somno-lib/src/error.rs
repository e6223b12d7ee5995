use thiserror::Error;

/// Rejected pipeline configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sampling rate for {channel} must be positive and finite, got {fs}")]
    InvalidSampleRate { channel: &'static str, fs: f64 },
    #[error("window length must be positive and finite, got {0} s")]
    InvalidWindow(f64),
}
