use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Clone, Debug, Parser)]
#[command(name = "diskspeed", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Configuration file to use instead of the default one.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output. Repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "p", name = "ping", about = "Measure round-trip latency")]
    Ping(PingArg),
    #[command(alias = "d", name = "download", about = "Measure download throughput")]
    Download(DownloadArg),
    #[command(alias = "u", name = "upload", about = "Measure upload throughput")]
    Upload(UploadArg),
    #[command(alias = "r", name = "run", about = "Ping, download and upload in sequence")]
    Run(RunArg),
    #[command(alias = "res", name = "resolve", about = "Show how a link would be downloaded")]
    Resolve(ResolveArg),
    #[command(subcommand, name = "auth", about = "Manage the provider sign-in")]
    Auth(AuthCommands),
    #[command(alias = "f", name = "fixture", about = "Create a random test file")]
    Fixture(FixtureArg),
    #[command(name = "completions", about = "Print shell completions")]
    Completions(CompletionsArg),
}

#[derive(Clone, Debug, Subcommand)]
pub enum AuthCommands {
    #[command(name = "login", about = "Sign in with a confirmation code")]
    Login(LoginArg),
    #[command(name = "logout", about = "Forget the stored token")]
    Logout,
    #[command(alias = "st", name = "status", about = "Check the stored token")]
    Status(StatusArg),
}

#[derive(Args, Clone, Debug)]
pub struct PingArg {
    /// Host to ping. Defaults to the configured ping URL.
    pub url: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct DownloadArg {
    /// Sharing link, direct URL or `file://` URL. Defaults to a random
    /// configured sample.
    pub url: Option<String>,

    /// Do not append a cache-busting query parameter.
    #[arg(long)]
    pub no_cache_bust: bool,
}

#[derive(Args, Clone, Debug)]
pub struct UploadArg {
    /// File to upload. Defaults to a random temporary file.
    pub file: Option<PathBuf>,

    /// Size of the generated file in MiB.
    #[arg(long, value_name = "MIB")]
    pub size: Option<u64>,
}

#[derive(Args, Clone, Debug)]
pub struct RunArg {
    /// Skip the upload step.
    #[arg(long)]
    pub no_upload: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ResolveArg {
    pub url: String,
}

#[derive(Args, Clone, Debug)]
pub struct LoginArg {
    /// Confirmation code. Prompted for when omitted.
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct StatusArg {
    /// Also check that the token may write to the disk.
    #[arg(long)]
    pub check_write: bool,
}

#[derive(Args, Clone, Debug)]
pub struct FixtureArg {
    /// Output path. Defaults to the local sample in the temp directory.
    pub path: Option<PathBuf>,

    /// Size in MiB.
    #[arg(long, value_name = "MIB")]
    pub size: Option<u64>,
}

#[derive(Args, Clone, Debug)]
pub struct CompletionsArg {
    pub shell: Shell,
}
