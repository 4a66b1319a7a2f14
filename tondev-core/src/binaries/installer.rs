//! Download and install orchestration for toolchain binaries.
//!
//! The `Installer` is the main entry point: it resolves a source pattern on
//! the binaries origin, streams the payload, unpacks it, and optionally marks
//! it executable and registers it with the package manager.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::downloader::{download_and_gunzip, download_to_file, remove_quietly};
use super::extractor::{extract_zip, make_executable};
use super::manifest::BinariesClient;
use super::paths::unique_file_path;
use super::types::{ArchiveKind, DownloadTarget, InstallOptions, Platform};
use crate::config::ProvisionSettings;
use crate::error::{ProvisionError, Result};
use crate::process::{ProcessRunner, SpawnOptions};
use crate::terminal::Terminal;

const PACKAGE_DESCRIPTOR: &str = "package.json";
const STAGED_ZIP_PATTERN: &str = ".tondev-download{}.zip";

/// Fetches and installs binaries one operation at a time.
#[derive(Debug, Clone)]
pub struct Installer {
    client: BinariesClient,
    runner: ProcessRunner,
    platform: Platform,
}

impl Installer {
    pub fn new(settings: ProvisionSettings) -> Result<Self> {
        Ok(Self {
            client: BinariesClient::new(settings)?,
            runner: ProcessRunner::new(),
            platform: Platform::detect(),
        })
    }

    /// Makes downloads, extraction and spawned processes observe `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.client = self.client.with_cancellation(cancel.clone());
        self.runner = self.runner.with_cancellation(cancel);
        self
    }

    pub fn client(&self) -> &BinariesClient {
        &self.client
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    fn settings(&self) -> &ProvisionSettings {
        self.client.settings()
    }

    // ========================================================================
    // Binaries Origin
    // ========================================================================

    /// Installs a [`DownloadTarget`].
    pub async fn install(&self, terminal: &dyn Terminal, target: &DownloadTarget) -> Result<()> {
        self.download_from_binaries(terminal, &target.destination, &target.source, &target.options)
            .await
    }

    /// Downloads `source` from the binaries origin into `dest_path`.
    ///
    /// `.zip` payloads are extracted into the parent directory of `dest_path`.
    /// `.gz` payloads are decompressed to `dest_path`; when that is a `.tar`
    /// file it is unpacked with `tar xvf` and removed afterwards.
    pub async fn download_from_binaries(
        &self,
        terminal: &dyn Terminal,
        dest_path: &Path,
        source: &str,
        options: &InstallOptions,
    ) -> Result<()> {
        let source = self.platform.substitute(source);
        let kind = ArchiveKind::from_source(&source)?;
        if options.globally && options.version.is_none() {
            return Err(ProvisionError::VersionRequired);
        }
        let url = self.client.binary_url(&source)?;

        info!("Installing {} from {}", dest_path.display(), url);
        terminal.write(&format!("Downloading from {url}"));

        let dest_dir = parent_dir(dest_path);
        tokio::fs::create_dir_all(&dest_dir).await?;

        match kind {
            ArchiveKind::Zip => {
                self.download_and_unzip(&url, &dest_dir, terminal).await?;
            }
            ArchiveKind::Gzip => {
                let response = self.client.open(&url).await?;
                download_and_gunzip(&self.client, response, dest_path, terminal).await?;
                if has_extension(dest_path, "tar") {
                    self.untar(dest_path, &dest_dir, terminal).await?;
                }
            }
        }

        if options.executable && !self.platform.is_windows() {
            let produced = options.adjusted_path.as_deref().unwrap_or(dest_path);
            make_executable(produced)?;
            // Executing right after chmod fails with ETXTBSY on some kernels.
            self.client
                .cancellable(tokio::time::sleep(self.settings().chmod_settle()))
                .await?;
        }

        if options.globally {
            let version = options
                .version
                .as_deref()
                .ok_or(ProvisionError::VersionRequired)?;
            if let Err(err) = self.install_globally(dest_path, version, terminal).await {
                remove_quietly(dest_path).await;
                return Err(err);
            }
        }

        terminal.write("\n");
        info!("Installed {}", dest_path.display());
        Ok(())
    }

    // ========================================================================
    // GitHub
    // ========================================================================

    /// Downloads a zip from an arbitrary URL and extracts it into `dest_path`.
    pub async fn download_from_github(
        &self,
        terminal: &dyn Terminal,
        source_url: &str,
        dest_path: &Path,
    ) -> Result<()> {
        let url = Url::parse(source_url).map_err(|source| ProvisionError::InvalidUrl {
            url: source_url.to_string(),
            source,
        })?;

        terminal.write(&format!("Downloading from {url}"));
        tokio::fs::create_dir_all(dest_path).await?;
        self.download_and_unzip(&url, dest_path, terminal).await?;
        terminal.write("\n");
        Ok(())
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Streams a zip next to `dest_dir`, extracts it there and drops the archive.
    async fn download_and_unzip(
        &self,
        url: &Url,
        dest_dir: &Path,
        terminal: &dyn Terminal,
    ) -> Result<Vec<PathBuf>> {
        let response = self.client.open(url).await?;
        let staged = unique_file_path(dest_dir, STAGED_ZIP_PATTERN);
        let archive = download_to_file(&self.client, response, &staged, terminal).await?;

        let extraction = {
            let archive = archive.clone();
            let dest_dir = dest_dir.to_path_buf();
            tokio::task::spawn_blocking(move || extract_zip(&archive, &dest_dir))
        };
        let extracted = self.client.cancellable(extraction).await;
        remove_quietly(&archive).await;

        let extracted = extracted??;
        let extracted = extracted?;
        debug!("Extracted {} files into {}", extracted.len(), dest_dir.display());
        Ok(extracted)
    }

    async fn untar(&self, tar_path: &Path, dest_dir: &Path, terminal: &dyn Terminal) -> Result<()> {
        // tar runs inside dest_dir, so hand it the bare file name.
        let tar_arg = tar_path
            .file_name()
            .unwrap_or_else(|| tar_path.as_os_str());
        let result = self
            .runner
            .run(
                "tar",
                &[OsStr::new("xvf"), tar_arg],
                &SpawnOptions::in_dir(dest_dir),
                terminal,
            )
            .await;
        remove_quietly(tar_path).await;
        result.map(|_| ())
    }

    /// Registers the binary at `dest_path` through the package manager.
    async fn install_globally(
        &self,
        dest_path: &Path,
        version: &str,
        terminal: &dyn Terminal,
    ) -> Result<()> {
        let bin_dir = parent_dir(dest_path);
        let file_name = dest_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let descriptor = PackageDescriptor::for_binary(&file_name, version);
        let manager = self.settings().package_manager.clone();

        let result: Result<String> = async {
            tokio::fs::write(bin_dir.join(PACKAGE_DESCRIPTOR), descriptor.to_json()?).await?;
            self.runner
                .run(&manager, &["install", "-g"], &SpawnOptions::in_dir(&bin_dir), terminal)
                .await
        }
        .await;

        match result {
            Ok(_) => {
                info!("Registered {} {} globally", descriptor.name, version);
                Ok(())
            }
            Err(ProvisionError::Cancelled) => Err(ProvisionError::Cancelled),
            Err(err) => {
                terminal.write_error(&format!("{err}\n"));
                Err(ProvisionError::GlobalInstall {
                    name: descriptor.name,
                    manager,
                    source: Box::new(err),
                })
            }
        }
    }
}

// ============================================================================
// Package Descriptor
// ============================================================================

/// Minimal package manifest written beside a globally installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackageDescriptor {
    name: String,
    version: String,
    bin: String,
}

impl PackageDescriptor {
    /// Name is the file name up to the first dot; `bin` keeps one extension.
    fn for_binary(file_name: &str, version: &str) -> Self {
        let mut parts = file_name.split('.');
        let name = parts.next().unwrap_or_default().to_string();
        let bin = match parts.next() {
            Some(ext) if !ext.is_empty() => format!("./{name}.{ext}"),
            _ => format!("./{name}"),
        };
        Self {
            name,
            version: version.to_string(),
            bin,
        }
    }

    fn to_json(&self) -> Result<String> {
        let value = serde_json::json!({
            "name": self.name,
            "version": self.version,
            "bin": self.bin,
        });
        serde_json::to_string_pretty(&value).map_err(|source| ProvisionError::Json {
            url: PACKAGE_DESCRIPTOR.to_string(),
            source,
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}
