//! Infrastructure implementation of the `ArtifactStore` port.
//!
//! Downloads go over HTTP(S) with `reqwest`; archives are zip files unpacked
//! on a blocking thread.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use crate::application::ports::ArtifactStore;

/// Connect timeout for artifact downloads. The transfer itself is unbounded;
/// weight files can be several gigabytes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP artifact store.
pub struct HttpArtifactStore {
    client: reqwest::Client,
}

impl HttpArtifactStore {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend init).
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl ArtifactStore for HttpArtifactStore {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid download URL: {url}"))?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "unsupported URL scheme: {}",
            parsed.scheme()
        );

        tracing::info!(url = %parsed, dest = %dest.display(), "downloading artifact");
        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .with_context(|| format!("failed to download {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("download of {url} failed: HTTP {}", response.status());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()))?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("failed to read body of {url}"))?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write {}", dest.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .with_context(|| format!("failed to flush {}", dest.display()))?;

        tracing::debug!(dest = %dest.display(), bytes = written, "download complete");
        Ok(written)
    }

    async fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let archive = archive.to_path_buf();
        let dest = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || unzip(&archive, &dest))
            .await
            .context("unpack task panicked")?
    }
}

/// Extract the zip file at `archive` into `dest`.
///
/// Entries whose names escape `dest` are skipped.
///
/// # Errors
///
/// Returns an error if the file is not a zip archive or an entry cannot be written.
pub fn unzip(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive)
        .with_context(|| format!("failed to open archive {}", archive.display()))?;
    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;

    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("{} is not a zip archive", archive.display()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("failed to read zip entry {i}"))?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = %entry.name(), "skipping zip entry outside the archive root");
            continue;
        };
        let outpath: PathBuf = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .with_context(|| format!("failed to create {}", outpath.display()))?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut out = std::fs::File::create(&outpath)
            .with_context(|| format!("failed to create {}", outpath.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to extract {}", outpath.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }
    Ok(())
}
