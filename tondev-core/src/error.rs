//! Error types for toolchain provisioning.

use thiserror::Error;

/// Errors raised by the provisioning engine.
///
/// Transport, filesystem and spawn errors keep their underlying message.
/// Only [`ProvisionError::GlobalInstall`] rewrites a failure into guidance
/// for the user.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// DNS, connection or HTTP protocol failure from the network layer.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Filesystem failure, or the raw error of a process that could not be spawned.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Redirect response from {url} has no `location` header")]
    RedirectWithoutLocation { url: String },

    #[error("Too many redirects (more than {limit}) while fetching {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Download from {url} failed with {status}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Manifest {url} has no `{name}` version list")]
    MissingVersions { name: String, url: String },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unexpected binary file extension: {0}")]
    UnexpectedExtension(String),

    #[error("Version required to install package")]
    VersionRequired,

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Non-zero exit. Diagnostics were already streamed to the terminal.
    #[error("{name} failed")]
    ProcessFailed { name: String },

    #[error(
        "An error occurred while trying to install {name} globally.\n\
         Make sure you can execute '{manager} i <package> -g' without using sudo and try again"
    )]
    GlobalInstall {
        name: String,
        manager: String,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, ProvisionError>;
