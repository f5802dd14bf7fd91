//! Pattern generation algorithms.
//!
//! - **Segmentation**: partition a mesh into connected, roughly flat panels
//! - **Parameterization**: LSCM flattening of one panel to millimeters
//! - **Layout**: shelf packing of flattened panels
//! - **Validation**: per-panel and set-level checks, fabric estimates
//! - **Pipeline**: the whole request, with cancellation and progress

pub mod cancel;
pub mod layout;
pub mod parameterize;
pub mod pipeline;
pub mod progress;
pub mod segment;
pub mod spatial;
pub mod validate;

pub use cancel::CancelToken;
pub use progress::{GenerationStage, Progress, ProgressUpdate};
