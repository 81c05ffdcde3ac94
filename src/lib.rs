// Cycle Check - onset timing verification for rendered cycle clips
// Offline percussive onset analysis of `<name>_<beat>_<decay>.wav` files

// Module declarations
pub mod analysis;
pub mod audio;
pub mod batch;
pub mod capability;
pub mod config;
pub mod error;
pub mod fixtures;

// Re-exports for convenience
pub use analysis::{ClipMeasurement, ClipSpec, OnsetPipeline, OnsetTriple, ToleranceVerdict};
pub use batch::{BatchChecker, DirectoryOutcome, RunSummary};
pub use config::AppConfig;
pub use error::{CheckError, ErrorCode};
