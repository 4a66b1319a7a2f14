//! Remote version manifests and the shared HTTP client.
//!
//! The binaries origin serves `/<name>.json` documents shaped like
//! `{ "<name>": ["0.1.0", "0.2.0", ...] }`. Manifests are fetched on demand
//! and never cached.

use std::future::Future;

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::version::sort_descending;
use crate::config::ProvisionSettings;
use crate::error::{ProvisionError, Result};

/// Number of versions listed before the listing is cut.
pub const VERSIONS_DISPLAY_LIMIT: usize = 10;

/// Element appended to a cut listing. Never a valid version.
pub const MORE_VERSIONS_MARKER: &str = "...";

/// Returns true for the truncation marker of [`BinariesClient::load_binary_versions`].
pub fn is_more_marker(entry: &str) -> bool {
    entry == MORE_VERSIONS_MARKER
}

// ============================================================================
// Binaries Client
// ============================================================================

/// HTTP access to the binary distribution origin.
///
/// Redirects are resolved here rather than by reqwest so the hop limit and
/// the missing-`location` error stay under our control.
#[derive(Debug, Clone)]
pub struct BinariesClient {
    http: Client,
    settings: ProvisionSettings,
    cancel: CancellationToken,
}

impl BinariesClient {
    pub fn new(settings: ProvisionSettings) -> Result<Self> {
        let http = Client::builder()
            .redirect(Policy::none())
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            settings,
            cancel: CancellationToken::new(),
        })
    }

    /// Makes every suspension point of this client observe `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &ProvisionSettings {
        &self.settings
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Absolute URL of a path on the binaries origin.
    pub fn binary_url(&self, path: &str) -> Result<Url> {
        let base = self.settings.binaries_base()?;
        base.join(path).map_err(|source| ProvisionError::InvalidUrl {
            url: format!("{base}{path}"),
            source,
        })
    }

    /// Runs `fut` unless the operation is cancelled first.
    pub(crate) async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ProvisionError::Cancelled),
            output = fut => Ok(output),
        }
    }

    /// Sends a GET, following redirects up to the configured limit.
    ///
    /// Returns the first non-redirect response whatever its status.
    async fn get_following_redirects(&self, url: &Url) -> Result<Response> {
        let mut current = url.clone();
        let mut hops = 0;
        loop {
            debug!("GET {}", current);
            let response = self
                .cancellable(self.http.get(current.clone()).send())
                .await??;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| ProvisionError::RedirectWithoutLocation {
                    url: current.to_string(),
                })?;

            if hops == self.settings.max_redirects {
                return Err(ProvisionError::TooManyRedirects {
                    url: url.to_string(),
                    limit: self.settings.max_redirects,
                });
            }
            hops += 1;

            let next = current
                .join(location)
                .map_err(|source| ProvisionError::InvalidUrl {
                    url: location.to_string(),
                    source,
                })?;
            debug!("Redirect {} -> {}", current, next);
            current = next;
        }
    }

    /// Opens a download, failing on any non-success status.
    pub(crate) async fn open(&self, url: &Url) -> Result<Response> {
        let response = self.get_following_redirects(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    // ========================================================================
    // Manifests
    // ========================================================================

    /// Fetches `url` and parses the whole body as JSON.
    pub async fn get_json(&self, url: &Url) -> Result<JsonValue> {
        let response = self.open(url).await?;
        let body = self.cancellable(response.bytes()).await??;
        serde_json::from_slice(&body).map_err(|source| ProvisionError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Lists available versions of `name`, newest first.
    ///
    /// More than [`VERSIONS_DISPLAY_LIMIT`] versions are cut to the newest ten
    /// followed by [`MORE_VERSIONS_MARKER`].
    pub async fn load_binary_versions(&self, name: &str) -> Result<Vec<String>> {
        let url = self.binary_url(&format!("{name}.json"))?;
        let manifest = self.get_json(&url).await?;

        let entries = manifest
            .get(name)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| ProvisionError::MissingVersions {
                name: name.to_string(),
                url: url.to_string(),
            })?;
        let mut versions: Vec<String> = entries
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if versions.len() < entries.len() {
            debug!(
                "Ignored {} non-string entries in {}",
                entries.len() - versions.len(),
                url
            );
        }

        sort_descending(&mut versions);
        info!("{} has {} published versions", name, versions.len());

        if versions.len() > VERSIONS_DISPLAY_LIMIT {
            versions.truncate(VERSIONS_DISPLAY_LIMIT);
            versions.push(MORE_VERSIONS_MARKER.to_string());
        }
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client_for(server: &Server) -> BinariesClient {
        let settings = ProvisionSettings::default().with_binaries_url(server.url());
        BinariesClient::new(settings).unwrap()
    }

    #[tokio::test]
    async fn test_load_binary_versions_truncates() {
        let mut server = Server::new_async().await;
        let versions: Vec<String> = (1..=12).map(|minor| format!("0.{minor}.0")).collect();
        let body = serde_json::json!({ "solc": versions }).to_string();

        let _m = server
            .mock("GET", "/solc.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let listed = client_for(&server).load_binary_versions("solc").await.unwrap();

        assert_eq!(listed.len(), 11);
        assert_eq!(listed[0], "0.12.0");
        assert_eq!(listed[9], "0.3.0");
        assert!(is_more_marker(&listed[10]));
    }

    #[tokio::test]
    async fn test_load_binary_versions_short_list() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/tonos-cli.json")
            .with_status(200)
            .with_body(r#"{ "tonos-cli": ["0.9.0", "latest", "1.0.0"] }"#)
            .create_async()
            .await;

        let listed = client_for(&server)
            .load_binary_versions("tonos-cli")
            .await
            .unwrap();

        assert_eq!(listed, vec!["latest", "1.0.0", "0.9.0"]);
    }

    #[tokio::test]
    async fn test_load_binary_versions_skips_non_strings() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/solc.json")
            .with_status(200)
            .with_body(r#"{ "solc": ["0.1.0", 7, null, "0.2.0"] }"#)
            .create_async()
            .await;

        let listed = client_for(&server).load_binary_versions("solc").await.unwrap();
        assert_eq!(listed, vec!["0.2.0", "0.1.0"]);
    }

    #[tokio::test]
    async fn test_load_binary_versions_missing_key() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/solc.json")
            .with_status(200)
            .with_body(r#"{ "other": ["1.0.0"] }"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .load_binary_versions("solc")
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::MissingVersions { .. }));
    }

    #[tokio::test]
    async fn test_get_json_follows_redirect() {
        let mut server = Server::new_async().await;
        let target = format!("{}/moved/se.json", server.url());

        let _old = server
            .mock("GET", "/se.json")
            .with_status(301)
            .with_header("location", &target)
            .create_async()
            .await;
        let _new = server
            .mock("GET", "/moved/se.json")
            .with_status(200)
            .with_body(r#"{ "se": ["0.24.5"] }"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let url = client.binary_url("se.json").unwrap();
        let json = client.get_json(&url).await.unwrap();

        assert_eq!(json["se"][0], "0.24.5");
    }

    #[tokio::test]
    async fn test_get_json_relative_redirect() {
        let mut server = Server::new_async().await;
        let _old = server
            .mock("GET", "/a.json")
            .with_status(301)
            .with_header("location", "/b.json")
            .create_async()
            .await;
        let _new = server
            .mock("GET", "/b.json")
            .with_status(200)
            .with_body("[1, 2]")
            .create_async()
            .await;

        let client = client_for(&server);
        let json = client
            .get_json(&client.binary_url("a.json").unwrap())
            .await
            .unwrap();
        assert_eq!(json, serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/solc.json")
            .with_status(301)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .get_json(&client.binary_url("solc.json").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::RedirectWithoutLocation { .. }));
        assert!(err.to_string().contains("location"));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_capped() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/loop.json")
            .with_status(301)
            .with_header("location", "/loop.json")
            .expect(6)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .get_json(&client.binary_url("loop.json").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::TooManyRedirects { limit: 5, .. }));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_json_rejects_non_json() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/solc.json")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .get_json(&client.binary_url("solc.json").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Json { .. }));
    }

    #[tokio::test]
    async fn test_get_json_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing.json")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .get_json(&client.binary_url("missing.json").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::UnexpectedStatus { status, .. } if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn test_cancelled_client_does_not_fetch() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/solc.json")
            .with_status(200)
            .with_body("{}")
            .expect(0)
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = client_for(&server).with_cancellation(cancel);

        let err = client.load_binary_versions("solc").await.unwrap_err();
        assert!(matches!(err, ProvisionError::Cancelled));
        m.assert_async().await;
    }

    #[test]
    fn test_binary_url_joins_origin() {
        let settings = ProvisionSettings::default();
        let client = BinariesClient::new(settings).unwrap();
        assert_eq!(
            client.binary_url("solc_0_66_0_linux.zip").unwrap().as_str(),
            "https://binaries.tonlabs.io/solc_0_66_0_linux.zip"
        );
    }
}
