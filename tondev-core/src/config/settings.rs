//! Provisioning settings.
//!
//! Settings are plain data, optionally loaded from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::{ProvisionError, Result};

// =============================================================================
// Defaults
// =============================================================================

/// Origin serving version manifests and binary payloads.
pub const DEFAULT_BINARIES_URL: &str = "https://binaries.tonlabs.io/";

/// Package manager used to register binaries globally.
pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";

const DEFAULT_MAX_REDIRECTS: usize = 5;

// Freshly chmodded files fail with ETXTBSY on some Linux kernels when run immediately.
const DEFAULT_CHMOD_SETTLE_MS: u64 = 100;

// =============================================================================
// Provision Settings
// =============================================================================

/// Settings shared by every provisioning operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    /// Binary distribution origin (manifests and payloads).
    pub binaries_url: String,

    /// Maximum number of redirect hops followed per request.
    pub max_redirects: usize,

    /// Pause after making a binary executable, in milliseconds.
    pub chmod_settle_ms: u64,

    /// Command used for `<manager> install -g`.
    pub package_manager: String,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            binaries_url: DEFAULT_BINARIES_URL.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            chmod_settle_ms: DEFAULT_CHMOD_SETTLE_MS,
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
            user_agent: format!("tondev/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ProvisionSettings {
    /// Loads settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| ProvisionError::Json {
            url: path.display().to_string(),
            source,
        })
    }

    /// Returns a copy pointing at another binaries origin.
    pub fn with_binaries_url(mut self, url: impl Into<String>) -> Self {
        self.binaries_url = url.into();
        self
    }

    /// Parses the binaries origin as a base URL that relative paths can join onto.
    pub fn binaries_base(&self) -> Result<Url> {
        let mut raw = self.binaries_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|source| ProvisionError::InvalidUrl { url: raw, source })
    }

    /// Delay applied after chmod.
    pub fn chmod_settle(&self) -> Duration {
        Duration::from_millis(self.chmod_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_distribution_origin() {
        let settings = ProvisionSettings::default();
        assert_eq!(settings.binaries_url, DEFAULT_BINARIES_URL);
        assert_eq!(settings.max_redirects, 5);
        assert_eq!(settings.chmod_settle(), Duration::from_millis(100));
        assert_eq!(settings.package_manager, "npm");
        assert!(settings.user_agent.starts_with("tondev/"));
    }

    #[test]
    fn binaries_base_gets_trailing_slash() {
        let settings = ProvisionSettings::default().with_binaries_url("http://127.0.0.1:1234");
        let base = settings.binaries_base().unwrap();
        assert_eq!(base.as_str(), "http://127.0.0.1:1234/");
        assert_eq!(
            base.join("solc.json").unwrap().as_str(),
            "http://127.0.0.1:1234/solc.json"
        );
    }

    #[test]
    fn binaries_base_rejects_garbage() {
        let settings = ProvisionSettings::default().with_binaries_url("not a url");
        assert!(matches!(
            settings.binaries_base(),
            Err(ProvisionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn load_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "package_manager": "pnpm", "max_redirects": 2 }}"#).unwrap();

        let settings = ProvisionSettings::load(file.path()).unwrap();
        assert_eq!(settings.package_manager, "pnpm");
        assert_eq!(settings.max_redirects, 2);
        assert_eq!(settings.binaries_url, DEFAULT_BINARIES_URL);
    }

    #[test]
    fn load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();

        assert!(matches!(
            ProvisionSettings::load(file.path()),
            Err(ProvisionError::Json { .. })
        ));
    }
}
