//! Core types for binary provisioning.
//!
//! Host platform identification, payload kinds and install options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

/// Token in source patterns replaced by [`Platform::as_str`].
pub const PLATFORM_PLACEHOLDER: &str = "{p}";

// ============================================================================
// Platform Detection
// ============================================================================

/// Host operating system, named the way the binary distribution names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
    Other(&'static str),
}

impl Platform {
    /// Detects the platform this process runs on.
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::Darwin,
            "windows" => Self::Win32,
            other => Self::Other(other),
        }
    }

    /// Identifier substituted into source patterns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Win32 => "win32",
            Self::Other(name) => name,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Win32)
    }

    /// Replaces the platform placeholder in a source pattern.
    pub fn substitute(&self, pattern: &str) -> String {
        pattern.replace(PLATFORM_PLACEHOLDER, self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payload Kind
// ============================================================================

/// How a downloaded payload is unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveKind {
    /// Zip archive extracted into the destination directory.
    Zip,
    /// Single gzip-compressed file decompressed to the destination path.
    Gzip,
}

impl ArchiveKind {
    /// Picks the kind from the lowercased extension of a source path.
    pub fn from_source(source: &str) -> Result<Self> {
        let ext = Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "zip" => Ok(Self::Zip),
            "gz" => Ok(Self::Gzip),
            "" => Err(ProvisionError::UnexpectedExtension(String::new())),
            other => Err(ProvisionError::UnexpectedExtension(format!(".{other}"))),
        }
    }
}

// ============================================================================
// Install Options
// ============================================================================

/// Post-download steps for a binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Mark the produced file executable (ignored on Windows).
    pub executable: bool,
    /// File to chmod when it differs from the destination path.
    pub adjusted_path: Option<PathBuf>,
    /// Register the binary through the package manager.
    pub globally: bool,
    /// Version written into the package descriptor. Required with `globally`.
    pub version: Option<String>,
}

impl InstallOptions {
    pub fn executable() -> Self {
        Self {
            executable: true,
            ..Self::default()
        }
    }

    pub fn globally(mut self, version: impl Into<String>) -> Self {
        self.globally = true;
        self.version = Some(version.into());
        self
    }

    pub fn adjusted_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.adjusted_path = Some(path.into());
        self
    }
}

/// A single request to fetch and install one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Path relative to the binaries origin, may contain [`PLATFORM_PLACEHOLDER`].
    pub source: String,
    /// Where the payload lands.
    pub destination: PathBuf,
    pub options: InstallOptions,
}

impl DownloadTarget {
    pub fn new(source: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            options: InstallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }
}
