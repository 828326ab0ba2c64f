use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::CommandFactory;
use clap_complete::generate;
use diskspeed_auth::{Authenticator, CredentialProvider, TokenStore, WriteAccess};
use diskspeed_fetch::{Credential, ReqwestClient, ThroughputEngine, ThroughputResult};
use indicatif::HumanBytes;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{
    App, AuthCommands, CompletionsArg, DownloadArg, FixtureArg, LoginArg, PingArg, ResolveArg,
    RunArg, StatusArg, UploadArg,
};
use crate::config::Settings;
use crate::fixture;
use crate::progress::{ProgressTracker, ProgressTrackerConfig, Tracker};
use crate::sample;

const MIB: u64 = 1024 * 1024;

type Client = Arc<ReqwestClient>;

/// Shared state of one invocation.
pub struct Context {
    pub settings: Settings,
    pub engine: ThroughputEngine<Client>,
    pub auth: Authenticator<Client>,
    pub cancel: CancellationToken,
    hide_progress: bool,
}

impl Context {
    pub fn new(settings: Settings, cancel: CancellationToken, hide_progress: bool) -> Result<Self> {
        let client = Arc::new(
            ReqwestClient::with_settings(&settings.client)
                .context("Failed to build HTTP client")?,
        );
        let engine = ThroughputEngine::new(client.clone(), settings.provider.clone())
            .with_options(settings.engine.clone());
        let auth = Authenticator::new(
            client,
            settings.oauth.clone(),
            settings.provider.clone(),
            TokenStore::new(settings.token_path()),
        );
        Ok(Self {
            settings,
            engine,
            auth,
            cancel,
            hide_progress,
        })
    }

    /// Token from the configuration, else the stored sign-in.
    async fn credential(&self) -> Result<Option<Credential>> {
        if let Some(token) = self.settings.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Some(Credential::new(token)));
        }
        Ok(self.auth.access_token().await?)
    }

    fn tracker(&self, label: &str) -> ProgressTracker {
        ProgressTracker::new(ProgressTrackerConfig {
            label: label.to_string(),
            hidden: self.hide_progress,
        })
    }
}

fn mib_to_bytes(mib: u64) -> Result<u64> {
    match mib.checked_mul(MIB) {
        Some(bytes) => Ok(bytes),
        None => bail!("size of {mib} MiB is too large"),
    }
}

fn summary(result: &ThroughputResult) -> String {
    format!(
        "{:.2} Mbit/s ({} in {:.2} s)",
        result.megabits_per_second,
        HumanBytes(result.bytes),
        result.elapsed.as_secs_f64()
    )
}

pub async fn ping(ctx: &Context, arg: PingArg) -> Result<Duration> {
    let url = arg.url.unwrap_or_else(|| ctx.settings.tests.ping_url.clone());
    let latency = ctx.engine.measure_ping(&url, &ctx.cancel).await?;
    println!("Ping: {:.2} ms", latency.as_secs_f64() * 1000.0);
    Ok(latency)
}

pub async fn download(ctx: &Context, arg: DownloadArg) -> Result<ThroughputResult> {
    let url = match arg.url {
        Some(url) => url,
        None => {
            let plan = &ctx.settings.tests;
            sample::pick_download_source(
                ctx.engine.client(),
                &plan.download_links,
                Duration::from_secs(plan.availability_timeout_secs),
                plan.local_sample_size,
            )
            .await?
        }
    };
    let credential = ctx.credential().await?;

    let tracker = ctx.tracker("download");
    let result = ctx
        .engine
        .measure_download(
            &url,
            credential.as_ref(),
            Some(tracker.download_callback()),
            &ctx.cancel,
        )
        .await;
    tracker.finish(None);

    let result = result?;
    println!("Download: {}", summary(&result));
    Ok(result)
}

pub async fn upload(ctx: &Context, arg: UploadArg) -> Result<ThroughputResult> {
    let Some(credential) = ctx.credential().await? else {
        bail!("upload needs a sign-in, run `diskspeed auth login` first");
    };

    // Held until the upload finishes so the generated file outlives it.
    let mut generated = None;
    let path = match arg.file {
        Some(path) => path,
        None => {
            let size = match arg.size {
                Some(mib) => mib_to_bytes(mib)?,
                None => ctx.settings.tests.upload_size,
            };
            let file = tempfile::NamedTempFile::new().context("Failed to create upload file")?;
            fixture::create_random_file(file.path(), size).await?;
            info!(size, "generated upload file");
            let path = file.path().to_path_buf();
            generated = Some(file);
            path
        }
    };

    let tracker = ctx.tracker("upload");
    let result = ctx
        .engine
        .measure_upload(
            &path,
            &credential,
            Some(tracker.upload_callback()),
            &ctx.cancel,
        )
        .await;
    tracker.finish(None);
    drop(generated);

    let result = result?;
    println!("Upload: {}", summary(&result));
    Ok(result)
}

/// Ping, download and, when signed in, upload.
///
/// A failing step is reported and the next one still runs; cancellation
/// stops the whole run.
pub async fn run(ctx: &Context, arg: RunArg) -> Result<()> {
    let mut failed = 0;

    if let Err(e) = ping(ctx, PingArg { url: None }).await {
        check_step("ping", e, &mut failed)?;
    }

    let download_arg = DownloadArg {
        url: None,
        no_cache_bust: false,
    };
    if let Err(e) = download(ctx, download_arg).await {
        check_step("download", e, &mut failed)?;
    }

    if arg.no_upload {
        info!("upload skipped");
    } else if ctx.credential().await?.is_none() {
        println!("Upload: skipped, not signed in");
    } else {
        let upload_arg = UploadArg {
            file: None,
            size: None,
        };
        if let Err(e) = upload(ctx, upload_arg).await {
            check_step("upload", e, &mut failed)?;
        }
    }

    if failed > 0 {
        bail!("{failed} test(s) failed");
    }
    Ok(())
}

fn check_step(step: &str, e: anyhow::Error, failed: &mut u32) -> Result<()> {
    if is_cancelled(&e) {
        return Err(e);
    }
    *failed += 1;
    eprintln!("{step} failed: {e:#}");
    Ok(())
}

pub fn is_cancelled(e: &anyhow::Error) -> bool {
    e.downcast_ref::<diskspeed_fetch::Error>()
        .is_some_and(diskspeed_fetch::Error::is_cancelled)
}

pub async fn resolve(ctx: &Context, arg: ResolveArg) -> Result<()> {
    let credential = ctx.credential().await?;
    let source = ctx.engine.resolve(&arg.url, credential.as_ref()).await;
    println!("Resolved via: {}", source.kind);
    println!("URL: {}", source.effective_url);
    if let Some(size) = source.known_size {
        println!("Size: {}", HumanBytes(size));
    }
    Ok(())
}

pub async fn auth(ctx: &Context, cmd: AuthCommands) -> Result<()> {
    match cmd {
        AuthCommands::Login(arg) => login(ctx, arg).await,
        AuthCommands::Logout => {
            ctx.auth.logout().await?;
            println!("Signed out");
            Ok(())
        }
        AuthCommands::Status(arg) => status(ctx, arg).await,
    }
}

async fn login(ctx: &Context, arg: LoginArg) -> Result<()> {
    let code = match arg.code {
        Some(code) => code,
        None => {
            eprintln!("Open this page and allow access:");
            eprintln!("  {}", ctx.auth.authorization_page());
            eprint!("Confirmation code: ");
            let mut line = String::new();
            BufReader::new(tokio::io::stdin())
                .read_line(&mut line)
                .await
                .context("Failed to read confirmation code")?;
            line
        }
    };

    let credential = ctx.auth.exchange_code(&code).await?;
    match credential.expires_at() {
        Some(at) => println!("Signed in, token valid until {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Signed in"),
    }
    Ok(())
}

async fn status(ctx: &Context, arg: StatusArg) -> Result<()> {
    let Some(credential) = ctx.auth.restore().await? else {
        println!("Not signed in");
        return Ok(());
    };
    match credential.expires_at() {
        Some(at) => println!("Signed in, token valid until {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Signed in"),
    }

    if arg.check_write {
        match ctx.auth.probe_write(&credential).await? {
            WriteAccess::Granted => println!("Write access: granted"),
            WriteAccess::Denied { status } => {
                warn!(status, "write probe refused");
                println!("Write access: denied (HTTP {status})");
            }
        }
    }
    Ok(())
}

pub async fn fixture(ctx: &Context, arg: FixtureArg) -> Result<PathBuf> {
    let size = match arg.size {
        Some(mib) => mib_to_bytes(mib)?,
        None => ctx.settings.tests.local_sample_size,
    };
    let path = arg
        .path
        .unwrap_or_else(|| std::env::temp_dir().join(fixture::SAMPLE_FILE_NAME));
    fixture::create_random_file(&path, size).await?;
    println!("Wrote {} to {}", HumanBytes(size), path.display());
    Ok(path)
}

pub fn completions(arg: CompletionsArg) {
    let mut cmd = App::command();
    generate(arg.shell, &mut cmd, "diskspeed", &mut std::io::stdout());
}
