use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

/// Suffixes Chrome uses while a download is still being written
const PARTIAL_SUFFIXES: &[&str] = &[".crdownload", ".tmp"];

/// Process-local directory the browser saves downloads into
///
/// The directory is removed when this value is dropped.
pub struct DownloadDir {
    dir: TempDir,
}

impl DownloadDir {
    /// Create a fresh, empty download directory
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("github-app-rotator-")
            .tempdir()
            .context("Failed to create download directory")?;
        debug!("Download directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.path())
            .with_context(|| format!("Failed to list {}", self.path().display()))?
        {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    /// Fails unless nothing has been downloaded yet
    pub fn ensure_empty(&self) -> Result<()> {
        let entries = self.entries()?;
        anyhow::ensure!(
            entries.is_empty(),
            "Download directory is not empty: {:?}",
            entries
        );
        Ok(())
    }

    /// Wait until a download lands, then read and remove it
    ///
    /// Polls every `interval` with no upper bound. More than one finished file is an error.
    pub async fn wait_for_file(&self, interval: Duration) -> Result<(String, String)> {
        info!("Waiting for download in {}", self.path().display());

        let files = loop {
            let files: Vec<PathBuf> = self
                .entries()?
                .into_iter()
                .filter(|p| !is_partial(p))
                .collect();
            if !files.is_empty() {
                break files;
            }
            tokio::time::sleep(interval).await;
        };

        anyhow::ensure!(files.len() == 1, "Expected one downloaded file, found {:?}", files);

        let path = &files[0];
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Downloaded path has no file name: {}", path.display()))?;
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read downloaded file {}", path.display()))?;
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove downloaded file {}", path.display()))?;

        info!("Downloaded {}", name);
        Ok((name, data))
    }
}

/// In-progress download: a `.crdownload`/`.tmp` file, or a hidden
/// `.com.google.Chrome.*` / `.org.chromium.Chromium.*` temp file
fn is_partial(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return true,
    };
    name.starts_with('.') || PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
