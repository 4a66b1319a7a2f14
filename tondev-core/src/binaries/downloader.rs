//! Streaming downloads into staged files.
//!
//! Every received chunk prints one `.` on the terminal. Destination files are
//! owned by a [`StagedFile`] which removes them again unless the download
//! completes, so a failed or cancelled transfer never leaves partial output.

use futures::StreamExt;
use reqwest::Response;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::extractor::Gunzip;
use super::manifest::BinariesClient;
use crate::error::Result;
use crate::terminal::Terminal;

const PROGRESS_DOT: &str = ".";

// ============================================================================
// Staged File
// ============================================================================

/// A file being written by the installer.
///
/// Dropping it before [`StagedFile::commit`] closes the handle and deletes
/// the file. Deletion failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl StagedFile {
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(bytes).await?;
            self.written += bytes.len() as u64;
        }
        Ok(())
    }

    /// Flushes and closes the file, keeping it on disk.
    pub async fn commit(mut self) -> Result<PathBuf> {
        // Released only once durable; until then drop deletes the file.
        if let Some(file) = self.file.as_mut() {
            file.flush().await?;
            file.sync_all().await?;
        }
        self.file = None;
        debug!("Staged {} bytes at {}", self.written, self.path.display());
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Only a file that was never committed still holds its handle.
        if let Some(file) = self.file.take() {
            drop(file);
            remove_quietly_sync(&self.path);
        }
    }
}

/// Removes a file, logging instead of failing.
pub async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Cleanup of {} skipped: {}", path.display(), e);
    }
}

fn remove_quietly_sync(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) => debug!("Cleanup of {} skipped: {}", path.display(), e),
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// Streams the response body verbatim into `dest`.
pub async fn download_to_file(
    client: &BinariesClient,
    response: Response,
    dest: &Path,
    terminal: &dyn Terminal,
) -> Result<PathBuf> {
    let mut staged = StagedFile::create(dest).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = client.cancellable(stream.next()).await? {
        let chunk = chunk?;
        terminal.write(PROGRESS_DOT);
        client.cancellable(staged.write_all(&chunk)).await??;
    }

    let path = staged.commit().await?;
    info!("Download complete: {}", path.display());
    Ok(path)
}

/// Streams the response body through gunzip into `dest`.
pub async fn download_and_gunzip(
    client: &BinariesClient,
    response: Response,
    dest: &Path,
    terminal: &dyn Terminal,
) -> Result<PathBuf> {
    let mut staged = StagedFile::create(dest).await?;
    let mut gunzip = Gunzip::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = client.cancellable(stream.next()).await? {
        let chunk = chunk?;
        terminal.write(PROGRESS_DOT);
        let decoded = gunzip.feed(&chunk)?;
        client.cancellable(staged.write_all(&decoded)).await??;
    }

    let tail = gunzip.finish()?;
    staged.write_all(&tail).await?;

    let path = staged.commit().await?;
    info!("Decompressed download to {}", path.display());
    Ok(path)
}
