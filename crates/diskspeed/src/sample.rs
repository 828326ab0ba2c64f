use std::time::Duration;

use anyhow::Result;
use diskspeed_fetch::{ApiRequest, HttpClient, link};
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::fixture;

/// Pick a download link for an argument-less test.
///
/// One configured sharing link is chosen at random and checked with a
/// bounded `GET`. When it cannot be reached the local sample file is used.
pub async fn pick_download_source<C: HttpClient>(
    client: &C,
    links: &[String],
    timeout: Duration,
    local_sample_size: u64,
) -> Result<String> {
    let choice = links.choose(&mut rand::rng()).cloned();
    if let Some(url) = choice {
        match client.send(ApiRequest::get(&url).timeout(timeout)).await {
            Ok(response) if response.is_success() => return Ok(url),
            Ok(response) => warn!(url = %url, status = response.status, "sample link unavailable"),
            Err(e) => warn!(url = %url, error = %e, "sample link unreachable"),
        }
    }

    let path = fixture::ensure_local_sample(local_sample_size).await?;
    info!(path = %path.display(), "using local download sample");
    Ok(link::file_url(&path)?)
}
