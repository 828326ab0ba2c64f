//! Chunked transfer loops shared by downloads, local reads and uploads.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::core::{ProgressCadence, Stopwatch, percent_of};
use crate::data::{ProgressCallback, ProgressSample, UploadProgress, UploadProgressCallback};
use crate::effects::http::UploadBody;
use crate::error::{Error, Result};

/// Byte counter and report schedule for one transfer.
#[derive(Clone)]
pub struct ChunkMeter {
    stopwatch: Stopwatch,
    cadence: ProgressCadence,
    expected: Option<u64>,
    complete_at: Option<u64>,
    bytes: u64,
    last_chunk: u64,
    reported_last: bool,
}

impl ChunkMeter {
    /// `expected` drives the percentage and may be an estimate.
    pub fn new(stopwatch: Stopwatch, every: u64, expected: Option<u64>) -> Self {
        Self {
            stopwatch,
            cadence: ProgressCadence::new(every),
            expected,
            complete_at: None,
            bytes: 0,
            last_chunk: 0,
            reported_last: false,
        }
    }

    /// Also report the chunk that brings the total to exactly `size`.
    ///
    /// Only meaningful when `size` is authoritative.
    #[must_use]
    pub fn complete_at(mut self, size: Option<u64>) -> Self {
        self.complete_at = size;
        self
    }

    /// Count one chunk. Returns a sample when a report is due.
    pub fn record(&mut self, n: usize) -> Option<ProgressSample> {
        self.bytes += n as u64;
        self.last_chunk = n as u64;
        let due = self.cadence.tick() || self.complete_at == Some(self.bytes);
        self.reported_last = due;
        due.then(|| self.sample())
    }

    /// Closing sample for a transfer whose last chunk went unreported.
    pub fn finish(&mut self) -> Option<ProgressSample> {
        if self.cadence.chunks() == 0 || self.reported_last || !self.cadence.needs_final() {
            return None;
        }
        self.reported_last = true;
        Some(self.sample())
    }

    pub fn sample(&self) -> ProgressSample {
        ProgressSample {
            bytes_so_far: self.bytes,
            percent: percent_of(self.bytes, self.expected),
            elapsed: self.stopwatch.elapsed(),
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn last_chunk(&self) -> u64 {
        self.last_chunk
    }

    pub fn report(&self) -> TransferReport {
        TransferReport {
            bytes: self.bytes,
            elapsed: self.stopwatch.elapsed(),
            chunks: self.cadence.chunks(),
        }
    }
}

/// Totals of a finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes: u64,
    pub elapsed: Duration,
    pub chunks: u64,
}

fn emit(on_progress: Option<&ProgressCallback>, sample: &ProgressSample) {
    if let Some(cb) = on_progress {
        cb(sample);
    }
}

/// Read `reader` to the end in `chunk_size` pieces, discarding the data.
///
/// Cancellation is checked before every read and also interrupts a read that
/// is still waiting for data. `pace` sleeps between chunks.
pub async fn drain_chunks<R>(
    reader: &mut R,
    chunk_size: usize,
    meter: &mut ChunkMeter,
    cancel: &CancellationToken,
    pace: Duration,
    on_progress: Option<&ProgressCallback>,
) -> Result<TransferReport>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                transferred: meter.bytes(),
            });
        }

        let n = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Error::Cancelled {
                    transferred: meter.bytes(),
                });
            }
            read = reader.read(&mut buf) => read.map_err(|e| Error::TransferFailed(e.to_string()))?,
        };
        if n == 0 {
            break;
        }

        if let Some(sample) = meter.record(n) {
            emit(on_progress, &sample);
        }

        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }

    if let Some(sample) = meter.finish() {
        emit(on_progress, &sample);
    }
    Ok(meter.report())
}

/// State driving an upload body.
pub(crate) struct UploadPump<R> {
    pub reader: R,
    pub chunk_size: usize,
    pub total: u64,
    pub meter: ChunkMeter,
    pub cancel: CancellationToken,
    /// Bytes handed to the transport so far, readable after a failed `PUT`.
    pub sent: Arc<AtomicU64>,
    pub on_progress: Option<UploadProgressCallback>,
}

impl<R> UploadPump<R> {
    fn emit(&self, sample: &ProgressSample) {
        if let Some(cb) = &self.on_progress {
            cb(&UploadProgress {
                chunk_bytes: self.meter.last_chunk(),
                bytes_so_far: sample.bytes_so_far,
                elapsed: sample.elapsed,
                total_size: self.total,
            });
        }
    }
}

/// Turn a reader into a streamed request body that reports progress as the
/// transport pulls chunks out of it.
pub(crate) fn upload_body<R>(pump: UploadPump<R>) -> UploadBody
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let length = pump.total;
    let stream = futures_util::stream::try_unfold(pump, |mut pump| async move {
        if pump.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "upload cancelled"));
        }

        let mut buf = vec![0u8; pump.chunk_size.max(1)];
        let n = pump.reader.read(&mut buf).await?;
        if n == 0 {
            if let Some(sample) = pump.meter.finish() {
                pump.emit(&sample);
            }
            return Ok(None);
        }

        buf.truncate(n);
        pump.sent.fetch_add(n as u64, Ordering::Relaxed);
        if let Some(sample) = pump.meter.record(n) {
            pump.emit(&sample);
        }
        Ok(Some((Bytes::from(buf), pump)))
    });

    UploadBody {
        length,
        stream: Box::pin(stream),
    }
}
