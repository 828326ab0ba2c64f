use std::sync::Arc;
use std::time::Duration;

use crate::core::speed_mbps;

/// A point-in-time view of a running transfer, handed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// Bytes moved since the transfer started.
    pub bytes_so_far: u64,

    /// Completion percentage in `0..=100`.
    ///
    /// `None` when the expected size is unknown; consumers should leave
    /// their progress indicator untouched in that case.
    pub percent: Option<u8>,

    /// Time since the first chunk was requested.
    pub elapsed: Duration,
}

impl ProgressSample {
    /// Instantaneous bitrate implied by this sample, in Mbit/s.
    #[must_use]
    pub fn current_mbps(&self) -> f64 {
        speed_mbps(self.bytes_so_far, self.elapsed.as_secs_f64())
    }
}

/// Progress of an upload, as seen by the presentation sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Size of the chunk that triggered this report.
    pub chunk_bytes: u64,
    pub bytes_so_far: u64,
    pub elapsed: Duration,
    pub total_size: u64,
}

impl UploadProgress {
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        crate::core::percent_of(self.bytes_so_far, Some(self.total_size))
    }

    #[must_use]
    pub fn current_mbps(&self) -> f64 {
        speed_mbps(self.bytes_so_far, self.elapsed.as_secs_f64())
    }
}

/// Download and local-read progress sink.
///
/// The engine calls this from whatever task runs the transfer. Hosts with a
/// single-threaded presentation layer must dispatch onto it themselves.
pub type ProgressCallback = Arc<dyn Fn(&ProgressSample) + Send + Sync>;

/// Upload progress sink.
pub type UploadProgressCallback = Arc<dyn Fn(&UploadProgress) + Send + Sync>;

/// Final outcome of a completed throughput measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputResult {
    pub bytes: u64,
    pub elapsed: Duration,
    pub megabits_per_second: f64,
}

impl ThroughputResult {
    pub fn new(bytes: u64, elapsed: Duration) -> Self {
        Self {
            bytes,
            elapsed,
            megabits_per_second: speed_mbps(bytes, elapsed.as_secs_f64()),
        }
    }
}
