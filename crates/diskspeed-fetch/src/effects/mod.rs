//! I/O: the HTTP transport, link resolution, upload provisioning and the
//! measurement engine that ties them together.

mod engine;
mod http;
mod latency;
mod provision;
mod resolve;
mod transfer;

pub use engine::ThroughputEngine;
pub use http::{
    ApiRequest, ApiResponse, BoxStream, HttpClient, Method, StreamingResponse, UploadBody,
};
pub use latency::probe_latency;
pub use provision::{UploadProvisioner, UploadTarget, upload_file_name};
pub use resolve::SourceResolver;
pub use transfer::{ChunkMeter, TransferReport, drain_chunks};

#[cfg(feature = "reqwest")]
pub use http::{ClientSettings, ReqwestClient};
