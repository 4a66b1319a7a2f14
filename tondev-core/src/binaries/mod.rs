//! Binary toolchain provisioning.
//!
//! Compilers and node tools are published on a binary distribution origin as
//! zip archives or gzip-compressed files, with one JSON manifest per tool
//! listing its versions.
//!
//! # Architecture
//!
//! - `types`: Platform, ArchiveKind, InstallOptions, DownloadTarget
//! - `version`: Ordering of dotted version strings
//! - `paths`: Collision-free file names and small path helpers
//! - `manifest`: HTTP client with redirect handling, version manifests
//! - `downloader`: Streaming downloads into staged files
//! - `extractor`: Zip extraction, incremental gunzip, chmod
//! - `installer`: High-level download and install operations
//!
//! # Example
//!
//! ```ignore
//! use tondev_core::binaries::{Installer, InstallOptions};
//! use tondev_core::{ConsoleTerminal, ProvisionSettings};
//!
//! let installer = Installer::new(ProvisionSettings::default())?;
//! let versions = installer.client().load_binary_versions("tonos-cli").await?;
//!
//! installer
//!     .download_from_binaries(
//!         &ConsoleTerminal,
//!         &bin_dir.join("tonos-cli"),
//!         &format!("tonos-cli-{}-{{p}}.gz", versions[0].replace('.', "_")),
//!         &InstallOptions::executable(),
//!     )
//!     .await?;
//! ```

pub mod downloader;
pub mod extractor;
pub mod installer;
pub mod manifest;
pub mod paths;
pub mod types;
pub mod version;

pub use downloader::StagedFile;
pub use installer::Installer;
pub use manifest::{is_more_marker, BinariesClient, MORE_VERSIONS_MARKER, VERSIONS_DISPLAY_LIMIT};
pub use paths::{change_ext, executable_name, unique_file_path};
pub use types::{ArchiveKind, DownloadTarget, InstallOptions, Platform, PLATFORM_PLACEHOLDER};
pub use version::{compare_versions, sort_descending, version_to_number, LATEST};
