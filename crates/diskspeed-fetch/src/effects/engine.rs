use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::TryStreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::fs::File;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::core::{Clock, Stopwatch, SystemClock, link};
use crate::data::credential::usable;
use crate::data::{
    Availability, Credential, Direction, EngineOptions, MeasurementSession, ProgressCallback,
    ProviderConfig, RemoteProbe, ResolvedSource, ThroughputResult, UploadProgressCallback,
};
use crate::effects::http::{ApiRequest, HttpClient};
use crate::effects::latency::probe_latency;
use crate::effects::provision::{UploadProvisioner, upload_file_name};
use crate::effects::resolve::SourceResolver;
use crate::effects::transfer::{ChunkMeter, UploadPump, drain_chunks, upload_body};
use crate::error::{Error, Result};

/// Latency and throughput measurement against a storage provider.
///
/// One engine can run any number of sequential or concurrent measurements;
/// each call owns its own session state and cancellation token.
///
/// # Examples
///
/// ```no_run
/// use diskspeed_fetch::{ProviderConfig, ReqwestClient, ThroughputEngine};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = ThroughputEngine::new(ReqwestClient::new()?, ProviderConfig::default());
/// let cancel = CancellationToken::new();
///
/// let latency = engine.measure_ping("https://yandex.ru", &cancel).await?;
/// let result = engine
///     .measure_download("https://disk.yandex.ru/d/vt-pDfQ1qOFpWQ", None, None, &cancel)
///     .await?;
/// println!("{latency:?}, {:.2} Mbit/s", result.megabits_per_second);
/// # Ok(())
/// # }
/// ```
pub struct ThroughputEngine<C> {
    client: C,
    provider: ProviderConfig,
    options: EngineOptions,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl<C: HttpClient> ThroughputEngine<C> {
    pub fn new(client: C, provider: ProviderConfig) -> Self {
        Self {
            client,
            provider,
            options: EngineOptions::default(),
            clock: Arc::new(SystemClock),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make cache-busting tokens reproducible.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn session(
        &self,
        target: impl Into<String>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> MeasurementSession {
        MeasurementSession::new(target, direction, cancel, self.clock.now())
    }

    fn cache_token(&self) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random()
    }

    /// Round-trip time to `url`.
    pub async fn measure_ping(&self, url: &str, cancel: &CancellationToken) -> Result<Duration> {
        let session = self.session(url, Direction::Ping, cancel);
        let span = session.span();
        async {
            let result = tokio::select! {
                biased;
                () = session.cancel.cancelled() => Err(Error::Cancelled { transferred: 0 }),
                result = probe_latency(&self.client, self.clock.clone(), url) => result,
            };
            match &result {
                Ok(latency) => info!(latency_ms = latency.as_millis() as u64, "ping complete"),
                Err(e) if e.is_cancelled() => info!("ping cancelled"),
                Err(e) => warn!(error = %e, "ping failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Resolve `url` to something that streams raw bytes.
    pub async fn resolve(&self, url: &str, credential: Option<&Credential>) -> ResolvedSource {
        SourceResolver::new(&self.client, &self.provider)
            .mirror_probe_timeout(self.options.mirror_probe_timeout)
            .resolve(url, credential)
            .await
    }

    /// `HEAD` the download URL to learn whether it exists and how large it is.
    ///
    /// The credential is only sent to provider hosts.
    pub async fn probe_availability(
        &self,
        url: &str,
        credential: Option<&Credential>,
    ) -> RemoteProbe {
        let mut request = ApiRequest::head(url);
        if let Some(credential) = usable(credential)
            && self.provider.attaches_credential(url)
        {
            request = request.header(self.provider.authorization(credential.token()));
        }

        match self.client.send(request).await {
            Ok(response) => {
                let availability = match response.status {
                    200 | 206 | 302 => Availability::Available,
                    403 if self.options.forbidden_means_available => Availability::Available,
                    403 => Availability::Inconclusive,
                    _ => Availability::Missing,
                };
                debug!(status = response.status, ?availability, "availability probe");
                RemoteProbe {
                    availability,
                    size: response
                        .is_success()
                        .then_some(response.content_length)
                        .flatten(),
                }
            }
            Err(e) => {
                debug!(error = %e, "availability probe failed");
                RemoteProbe {
                    availability: Availability::Inconclusive,
                    size: None,
                }
            }
        }
    }

    /// Download `url` and report its throughput. The bytes are discarded.
    ///
    /// `file:` URLs are read from disk instead.
    pub async fn measure_download(
        &self,
        url: &str,
        credential: Option<&Credential>,
        on_progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let session = self.session(url, Direction::Download, cancel);
        let span = session.span();
        async {
            let result = self
                .download(url, credential, on_progress.as_ref(), &session.cancel)
                .await;
            log_outcome(&result);
            result
        }
        .instrument(span)
        .await
    }

    /// Read a local file through the download pipeline.
    pub async fn measure_local(
        &self,
        path: &Path,
        on_progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let session = self.session(path.display().to_string(), Direction::Download, cancel);
        let span = session.span();
        async {
            let result = self
                .read_local(path, on_progress.as_ref(), &session.cancel)
                .await;
            log_outcome(&result);
            result
        }
        .instrument(span)
        .await
    }

    /// Upload the file at `path` and report its throughput.
    ///
    /// The remote name is derived from the current local time.
    pub async fn measure_upload(
        &self,
        path: &Path,
        credential: &Credential,
        on_progress: Option<UploadProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let session = self.session(path.display().to_string(), Direction::Upload, cancel);
        let span = session.span();
        async {
            let result = self
                .upload(path, credential, on_progress, &session.cancel)
                .await;
            log_outcome(&result);
            result
        }
        .instrument(span)
        .await
    }

    async fn download(
        &self,
        url: &str,
        credential: Option<&Credential>,
        on_progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let source = until_cancelled(cancel, 0, self.resolve(url, credential)).await?;
        if source.is_local {
            let path = link::local_path(&source.effective_url)
                .ok_or_else(|| Error::InvalidUrl(source.effective_url.clone()))?;
            return self.read_local(&path, on_progress, cancel).await;
        }
        self.download_remote(&source, credential, on_progress, cancel)
            .await
    }

    async fn download_remote(
        &self,
        source: &ResolvedSource,
        credential: Option<&Credential>,
        on_progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let probe = until_cancelled(
            cancel,
            0,
            self.probe_availability(&source.effective_url, credential),
        )
        .await?;
        if probe.availability == Availability::Missing {
            warn!(url = %source.effective_url, "source reported missing, downloading anyway");
        }
        let probed_size = source.known_size.or(probe.size).filter(|n| *n > 0);

        let request_url = if self.options.cache_bust {
            link::with_cache_buster(&source.effective_url, self.cache_token())?
        } else {
            source.effective_url.clone()
        };

        let response = until_cancelled(cancel, 0, self.client.stream(&request_url, &[]))
            .await?
            .map_err(Error::network)?;
        if !response.is_success() {
            return Err(Error::status(response.status, None));
        }

        let live_size = response.content_length.filter(|n| *n > 0);
        let expected = live_size.or(probed_size).unwrap_or(self.options.assumed_size);
        debug!(expected, live = live_size.is_some(), "download started");

        let mut meter = ChunkMeter::new(
            Stopwatch::start(self.clock.clone()),
            self.options.progress_every,
            Some(expected),
        )
        .complete_at(live_size);
        let mut reader = StreamReader::new(response.body.map_err(io::Error::other));
        let report = drain_chunks(
            &mut reader,
            self.options.chunk_size,
            &mut meter,
            cancel,
            Duration::ZERO,
            on_progress,
        )
        .await?;

        Ok(ThroughputResult::new(report.bytes, report.elapsed))
    }

    async fn read_local(
        &self,
        path: &Path,
        on_progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let mut file = open_local(path).await?;
        let size = file.metadata().await?.len();

        let mut meter = ChunkMeter::new(
            Stopwatch::start(self.clock.clone()),
            self.options.progress_every,
            Some(size),
        )
        .complete_at(Some(size));
        let report = drain_chunks(
            &mut file,
            self.options.chunk_size,
            &mut meter,
            cancel,
            self.options.local_chunk_delay,
            on_progress,
        )
        .await?;

        Ok(ThroughputResult::new(report.bytes, report.elapsed))
    }

    async fn upload(
        &self,
        path: &Path,
        credential: &Credential,
        on_progress: Option<UploadProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ThroughputResult> {
        let file = open_local(path).await?;
        let total = file.metadata().await?.len();

        let name = upload_file_name(chrono::Local::now());
        let provisioner = UploadProvisioner::new(&self.client, &self.provider);
        let target = until_cancelled(cancel, 0, provisioner.provision(&name, credential)).await??;

        let stopwatch = Stopwatch::start(self.clock.clone());
        let sent = Arc::new(AtomicU64::new(0));
        let meter = ChunkMeter::new(stopwatch.clone(), self.options.progress_every, Some(total))
            .complete_at(Some(total));
        let body = upload_body(UploadPump {
            reader: file,
            chunk_size: self.options.chunk_size,
            total,
            meter,
            cancel: cancel.clone(),
            sent: sent.clone(),
            on_progress,
        });

        // The body may be fully sent while the response is still pending.
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Error::Cancelled {
                    transferred: sent.load(Ordering::Relaxed),
                });
            }
            response = self.client.upload(&target.href, &[], body) => response,
        };
        let elapsed = stopwatch.elapsed();
        match response {
            Err(_) if cancel.is_cancelled() => Err(Error::Cancelled {
                transferred: sent.load(Ordering::Relaxed),
            }),
            Err(e) => Err(Error::TransferFailed(e.to_string())),
            Ok(response) if !response.is_success() => {
                Err(Error::status(response.status, Some(response.body)))
            }
            Ok(_) => {
                info!(remote_path = %target.remote_path, "upload stored");
                Ok(ThroughputResult::new(total, elapsed))
            }
        }
    }
}

/// Run `fut` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    transferred: u64,
    fut: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled { transferred }),
        output = fut => Ok(output),
    }
}

async fn open_local(path: &Path) -> Result<File> {
    match File::open(path).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(Error::LocalFileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn log_outcome(result: &Result<ThroughputResult>) {
    match result {
        Ok(r) => info!(
            bytes = r.bytes,
            elapsed_ms = r.elapsed.as_millis() as u64,
            mbps = r.megabits_per_second,
            "measurement complete"
        ),
        Err(Error::Cancelled { transferred }) => info!(transferred, "measurement cancelled"),
        Err(e) => warn!(error = %e, "measurement failed"),
    }
}
