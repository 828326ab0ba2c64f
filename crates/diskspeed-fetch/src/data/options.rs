use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Chunk size used by every transfer loop.
pub const CHUNK_SIZE: usize = 8192;

/// Size assumed for a download whose length the server does not report.
pub const ASSUMED_SIZE: u64 = 100 * 1024 * 1024;

/// Tuning knobs for the throughput engine.
///
/// # Examples
///
/// ```
/// use diskspeed_fetch::EngineOptions;
/// use std::time::Duration;
///
/// let options = EngineOptions::default()
///     .progress_every(1)
///     .local_chunk_delay(Duration::ZERO);
/// assert_eq!(options.chunk_size, 8192);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Bytes read or written per iteration.
    ///
    /// Progress cadence and cancellation are both evaluated per chunk.
    ///
    /// Default: 8192
    pub chunk_size: usize,

    /// Report progress every this many chunks.
    ///
    /// A final report is always emitted when the last chunk does not land
    /// on this boundary.
    ///
    /// Default: 10
    pub progress_every: u64,

    /// Expected size used for percentages when neither the live response
    /// nor the availability probe reports one.
    ///
    /// Default: 100 MiB
    pub assumed_size: u64,

    /// Timeout of the GET that checks a mirror candidate.
    ///
    /// Default: 5s
    #[serde(with = "duration_ms")]
    pub mirror_probe_timeout: Duration,

    /// Pause after each chunk read from a local file, emulating network
    /// latency so local runs produce plausible numbers.
    ///
    /// Default: 1ms
    #[serde(with = "duration_ms")]
    pub local_chunk_delay: Duration,

    /// Append a random `cache=` query parameter to download URLs.
    ///
    /// Default: true
    pub cache_bust: bool,

    /// Treat `403 Forbidden` from the availability probe as "file exists".
    ///
    /// Default: false (403 is inconclusive)
    pub forbidden_means_available: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            progress_every: 10,
            assumed_size: ASSUMED_SIZE,
            mirror_probe_timeout: Duration::from_secs(5),
            local_chunk_delay: Duration::from_millis(1),
            cache_bust: true,
            forbidden_means_available: false,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn progress_every(mut self, chunks: u64) -> Self {
        self.progress_every = chunks.max(1);
        self
    }

    #[must_use]
    pub fn assumed_size(mut self, bytes: u64) -> Self {
        self.assumed_size = bytes;
        self
    }

    #[must_use]
    pub fn mirror_probe_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn local_chunk_delay(mut self, delay: Duration) -> Self {
        self.local_chunk_delay = delay;
        self
    }

    #[must_use]
    pub fn cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = enabled;
        self
    }

    #[must_use]
    pub fn forbidden_means_available(mut self, enabled: bool) -> Self {
        self.forbidden_means_available = enabled;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
