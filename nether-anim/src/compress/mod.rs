//! Compression driver
//!
//! Runs one reduction scheme, encodes the surviving keys in the chosen formats
//! and measures the result by forward kinematics against the raw animation.
//! Optionally retries with alternative candidates and keeps the smallest one
//! that stays inside the error budget.

mod batch;
mod driver;
mod measure;
mod settings;


pub use batch::{BatchSummary, compress_batch};
pub use driver::{CompressedAnimation, compress, compress_candidate, reduce_tracks};
pub use measure::{ErrorStats, compute_compression_error};
pub use settings::{AlternativeSettings, CompressionCandidate, CompressionSettings, ReductionScheme};

pub use crate::reduce::LinearKeySettings;
