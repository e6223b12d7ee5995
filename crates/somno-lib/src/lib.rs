pub mod classify;
pub mod detectors;
pub mod error;
pub mod features;
pub mod filters;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod signal;

pub use classify::*;
pub use detectors::*;
pub use error::*;
pub use features::*;
pub use metrics::*;
pub use pipeline::*;
pub use signal::*;
