//! Latency and throughput measurement against cloud storage.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and types
//! - `core` - Pure transformations
//! - `effects` - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Link Resolution**: Sharing links are turned into direct download URLs
//!   through the provider API or a public mirror, falling back silently
//! - **Chunked Measurement**: Fixed-size chunks, a predictable progress
//!   cadence and cooperative cancellation between chunks
//! - **Injectable Edges**: HTTP transport and clock are traits, so every
//!   timing path can be exercised without a network
//! - **Mechanism-Only**: No presentation; the caller renders progress and
//!   decides which links to test

mod core;
pub mod data;
mod effects;
mod error;

pub use core::link;
pub use core::{
    Clock, ManualClock, ProgressCadence, Stopwatch, SystemClock, percent_of, speed_mbps,
};
pub use data::{
    ASSUMED_SIZE, Availability, CHUNK_SIZE, Credential, DEFAULT_STRATEGIES, Direction,
    EngineOptions, MeasurementSession, ProgressCallback, ProgressSample, ProviderConfig,
    RemoteProbe, ResolutionKind, ResolvedSource, Strategy, ThroughputResult, UploadProgress,
    UploadProgressCallback,
};
pub use effects::{
    ApiRequest, ApiResponse, BoxStream, ChunkMeter, HttpClient, Method, SourceResolver,
    StreamingResponse, ThroughputEngine, TransferReport, UploadBody, UploadProvisioner,
    UploadTarget, drain_chunks, probe_latency, upload_file_name,
};

#[cfg(feature = "reqwest")]
pub use effects::{ClientSettings, ReqwestClient};

pub use error::{Error, Result, StatusCategory};
