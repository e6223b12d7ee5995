pub mod ecg;
pub mod peaks;
pub mod ppg;

pub use ecg::*;
pub use peaks::*;
pub use ppg::*;
