pub mod activity;
pub mod hrv;
pub mod ptt;
pub mod spectral;

pub use activity::*;
pub use hrv::*;
pub use ptt::*;
pub use spectral::*;
