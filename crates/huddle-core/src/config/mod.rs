//! Client configuration.
//!
//! `ClientConfig` holds the public project URL and anon key every client
//! needs to reach the REST, auth and realtime endpoints. Values may come from
//! a local profile or from a bootstrap manifest served over HTTPS.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const BOOTSTRAP_SCHEMA_VERSION: u32 = 1;
const BOOTSTRAP_HTTP_TIMEOUT_SECS: u64 = 4;
const REALTIME_PROTOCOL_VERSION: &str = "1.0.0";

/// Build-provisioned client configuration.
///
/// These are safe-to-ship public values. Secret credentials must never be
/// stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub bootstrap_manifest_url: Option<String>,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// Send the optimistic temp id as `client_ref` with inserts so the
    /// change feed echoes it back
    #[serde(default = "default_echo_client_ref")]
    pub echo_client_ref: bool,
    /// Manifest flag; `false` disables live subscriptions
    #[serde(default = "default_realtime_enabled")]
    pub realtime_enabled: bool,
}

const fn default_echo_client_ref() -> bool {
    true
}

const fn default_realtime_enabled() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bootstrap_manifest_url: None,
            supabase_url: None,
            supabase_anon_key: None,
            echo_client_ref: default_echo_client_ref(),
            realtime_enabled: default_realtime_enabled(),
        }
    }
}

impl ClientConfig {
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: Some(supabase_url.into()),
            supabase_anon_key: Some(anon_key.into()),
            ..Self::default()
        }
    }

    /// Project base URL without trailing slash.
    pub fn base_url(&self) -> Result<String> {
        let url = normalize_text_option(self.supabase_url.clone())
            .ok_or_else(|| Error::Config("supabase_url is not configured".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
        Ok(url.trim_end_matches('/').to_string())
    }

    pub fn anon_key(&self) -> Result<String> {
        normalize_text_option(self.supabase_anon_key.clone())
            .ok_or_else(|| Error::Config("supabase_anon_key is not configured".to_string()))
    }

    pub fn rest_url(&self) -> Result<String> {
        Ok(format!("{}/rest/v1", self.base_url()?))
    }

    pub fn auth_url(&self) -> Result<String> {
        Ok(format!("{}/auth/v1", self.base_url()?))
    }

    /// Websocket endpoint of the realtime service, anon key included.
    pub fn realtime_url(&self) -> Result<String> {
        let base = self.base_url()?;
        let mut url = Url::parse(&format!("{base}/realtime/v1/websocket"))
            .map_err(|error| Error::Config(format!("invalid supabase_url: {error}")))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::Config("cannot derive realtime URL".to_string()))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.anon_key()?)
            .append_pair("vsn", REALTIME_PROTOCOL_VERSION);
        Ok(url.to_string())
    }

    /// Fail early when the values needed for any backend call are missing.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        self.anon_key()?;
        Ok(())
    }
}

/// Tunables for the realtime socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeSettings {
    pub heartbeat_interval: Duration,
    /// Delay before each reconnect attempt; the last entry repeats
    pub reconnect_ladder: Vec<Duration>,
    /// Per-channel buffer before slow subscribers start missing events
    pub channel_capacity: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(25),
            reconnect_ladder: [1, 2, 5, 10].map(Duration::from_secs).to_vec(),
            channel_capacity: 256,
        }
    }
}

impl RealtimeSettings {
    #[must_use]
    pub fn backoff(&self, attempt: usize) -> Duration {
        self.reconnect_ladder
            .get(attempt)
            .or_else(|| self.reconnect_ladder.last())
            .copied()
            .unwrap_or(Duration::from_secs(10))
    }
}

/// Resolve runtime config by fetching the manifest URL, when one is set.
///
/// Fetch, parse and validation failures are returned as errors instead of
/// falling back to the local values.
pub async fn resolve_client_config(fallback: ClientConfig) -> Result<ClientConfig> {
    let Some(manifest_url) = normalize_text_option(fallback.bootstrap_manifest_url.clone()) else {
        return Ok(fallback);
    };

    let mut resolved = fetch_bootstrap_manifest(&manifest_url).await?;
    resolved.echo_client_ref = fallback.echo_client_ref;
    Ok(resolved)
}

/// Parse a bootstrap manifest from a raw JSON payload.
pub fn parse_bootstrap_manifest(payload: &str, manifest_url: &str) -> Result<ClientConfig> {
    let manifest: BootstrapManifest = serde_json::from_str(payload)
        .map_err(|error| Error::Config(format!("invalid bootstrap manifest JSON: {error}")))?;
    manifest.into_client_config(manifest_url)
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct BootstrapManifest {
    schema_version: u32,
    manifest_version: String,
    supabase_url: String,
    supabase_anon_key: String,
    feature_flags: FeatureFlags,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FeatureFlags {
    realtime: bool,
}

impl BootstrapManifest {
    fn into_client_config(self, manifest_url: &str) -> Result<ClientConfig> {
        if self.schema_version != BOOTSTRAP_SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "unsupported bootstrap schema_version {} (expected {})",
                self.schema_version, BOOTSTRAP_SCHEMA_VERSION
            )));
        }
        if self.manifest_version.trim().is_empty() {
            return Err(Error::Config(
                "bootstrap manifest_version must not be empty".to_string(),
            ));
        }

        let supabase_url = normalize_required_http_url(self.supabase_url, "supabase_url")?;
        let supabase_anon_key =
            normalize_required_value(self.supabase_anon_key, "supabase_anon_key")?;

        Ok(ClientConfig {
            bootstrap_manifest_url: Some(manifest_url.to_string()),
            supabase_url: Some(supabase_url),
            supabase_anon_key: Some(supabase_anon_key),
            echo_client_ref: default_echo_client_ref(),
            realtime_enabled: self.feature_flags.realtime,
        })
    }
}

async fn fetch_bootstrap_manifest(url: &str) -> Result<ClientConfig> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(BOOTSTRAP_HTTP_TIMEOUT_SECS))
        .build()?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::Config(format!(
            "bootstrap endpoint returned HTTP {}: {}",
            status.as_u16(),
            compact_text(&body)
        )));
    }

    parse_bootstrap_manifest(&body, url)
}

fn normalize_required_value(raw: String, field: &str) -> Result<String> {
    normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config(format!("bootstrap field '{field}' is required")))
}

fn normalize_required_http_url(raw: String, field: &str) -> Result<String> {
    let value = normalize_required_value(raw, field)?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "bootstrap field '{field}' must include http:// or https://"
        )))
    }
}
