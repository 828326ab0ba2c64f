use std::sync::Arc;

use diskspeed_fetch::{ProgressCallback, ProgressSample, UploadProgress, UploadProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

pub trait Tracker {
    type Ctx: Clone;
    fn new(ctx: Self::Ctx) -> Self;
    fn finish(&self, msg: Option<String>);
}

const PB_STYLE: &str =
    "{spinner:.blue} {prefix:>8} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos:>3}% {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Percentage bar with the live bitrate as its message.
pub struct ProgressTracker {
    pub pb: ProgressBar,
}

#[derive(Debug, Clone)]
pub struct ProgressTrackerConfig {
    pub label: String,
    pub hidden: bool,
}

impl Tracker for ProgressTracker {
    type Ctx = ProgressTrackerConfig;

    fn new(ctx: Self::Ctx) -> Self {
        let pb = if ctx.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };

        let pb_style = PB_TEMPLATE
            .as_ref()
            .cloned()
            .unwrap_or_else(ProgressStyle::default_bar);
        pb.set_style(pb_style);
        pb.set_prefix(ctx.label);
        ProgressTracker { pb }
    }

    fn finish(&self, msg: Option<String>) {
        match msg {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish_and_clear(),
        }
    }
}

impl ProgressTracker {
    /// Feed download samples into the bar. Samples without a percentage
    /// only update the bitrate.
    pub fn download_callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |sample: &ProgressSample| {
            if let Some(percent) = sample.percent {
                pb.set_position(u64::from(percent));
            }
            pb.set_message(format!("{:.2} Mbit/s", sample.current_mbps()));
        })
    }

    pub fn upload_callback(&self) -> UploadProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |progress: &UploadProgress| {
            if let Some(percent) = progress.percent() {
                pb.set_position(u64::from(percent));
            }
            pb.set_message(format!("{:.2} Mbit/s", progress.current_mbps()));
        })
    }
}
