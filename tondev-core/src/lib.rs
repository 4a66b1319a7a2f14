//! tondev Core Library
//!
//! Toolchain provisioning and process orchestration for the tondev developer
//! environment. It includes:
//!
//! - Version manifests fetched from the binary distribution origin
//! - Streaming download, unpacking and installation of compiler binaries
//! - Global registration of binaries through the package manager
//! - Child process execution with output streamed to a terminal
//! - Progress line and table rendering on the same terminal

pub mod binaries;
pub mod config;
pub mod error;
pub mod process;
pub mod terminal;

// Re-exports for convenience
pub use config::ProvisionSettings;
pub use error::{ProvisionError, Result};

pub use binaries::{
    compare_versions, unique_file_path, version_to_number, BinariesClient, DownloadTarget,
    InstallOptions, Installer, Platform,
};

pub use process::{run, ProcessRunner, SpawnOptions};

pub use terminal::{
    format_table, ConsoleTerminal, MemoryTerminal, NullTerminal, ProgressLine, TableOptions,
    Terminal,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
