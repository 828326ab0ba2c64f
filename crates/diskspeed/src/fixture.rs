use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use diskspeed_fetch::CHUNK_SIZE;
use rand::RngCore;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Name of the local download sample in the temp directory.
pub const SAMPLE_FILE_NAME: &str = "test100mb.bin";

/// Write `size` random bytes to `path` in chunk-sized pieces.
pub async fn create_random_file(path: &Path, size: u64) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        rand::rng().fill_bytes(&mut buf[..n]);
        file.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }
    file.flush().await?;
    Ok(())
}

/// Path of the local download sample, created on first use.
pub async fn ensure_local_sample(size: u64) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(SAMPLE_FILE_NAME);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        info!(path = %path.display(), "creating local download sample");
        create_random_file(&path, size).await?;
    }
    Ok(path)
}
