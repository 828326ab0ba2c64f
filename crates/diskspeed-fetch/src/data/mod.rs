//! Immutable data types for throughput measurement.
//!
//! Configuration, credentials, progress samples and resolution results live
//! here. Nothing in this module performs I/O.

pub mod credential;
pub mod options;
pub mod progress;
pub mod provider;
pub mod session;
pub mod source;

pub use credential::Credential;
pub use options::{ASSUMED_SIZE, CHUNK_SIZE, EngineOptions};
pub use progress::{
    ProgressCallback, ProgressSample, ThroughputResult, UploadProgress, UploadProgressCallback,
};
pub use provider::ProviderConfig;
pub use session::{Direction, MeasurementSession};
pub use source::{
    Availability, DEFAULT_STRATEGIES, RemoteProbe, ResolutionKind, ResolvedSource, Strategy,
};
