//! Configuration file handling for saving and loading autologin settings.
//!
//! Every field has a default, so a missing file or a partial JSON document
//! yields the built-in behaviour for whatever is left out.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a probe endpoint answers when the network is not intercepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeExpectation {
    /// HTTP 204 with an empty body (e.g. `generate_204`)
    NoContent,
    /// A 2xx response whose body contains this marker
    Body(String),
}

/// A known-good URL used for connectivity probing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEndpoint {
    pub url: String,
    #[serde(default = "default_expectation")]
    pub expect: ProbeExpectation,
}

impl ProbeEndpoint {
    pub fn no_content(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expect: ProbeExpectation::NoContent,
        }
    }

    pub fn body(url: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expect: ProbeExpectation::Body(marker.into()),
        }
    }
}

fn default_expectation() -> ProbeExpectation {
    ProbeExpectation::NoContent
}

/// Where credentials are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretBackendKind {
    /// macOS login keychain via `security find-generic-password`
    Keychain,
    /// freedesktop secret service via `secret-tool lookup`
    SecretTool,
    /// Environment variables named after the upper-cased service
    Env,
}

impl Default for SecretBackendKind {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Keychain
        } else {
            Self::SecretTool
        }
    }
}

/// Autologin configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutologinConfig {
    // Probing
    pub probe_endpoints: Vec<ProbeEndpoint>,

    // Login verification
    pub success_markers: Vec<String>,

    // Timing
    pub http_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_unit_secs: u64,

    // HTTP session
    pub user_agent: String,

    // Logging
    pub log_file: PathBuf,

    // Credentials
    pub secret_backend: SecretBackendKind,
    pub username_service: String,
    pub password_service: String,
}

impl Default for AutologinConfig {
    fn default() -> Self {
        Self {
            probe_endpoints: vec![
                ProbeEndpoint::no_content("http://clients3.google.com/generate_204"),
                ProbeEndpoint::body("http://captive.apple.com/hotspot-detect.html", "Success"),
            ],
            success_markers: [
                "success",
                "登录成功",
                "welcome",
                "logout",
                "/home",
                "上网已连接",
                "已在线",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            http_timeout_secs: 8,
            max_attempts: 3,
            backoff_unit_secs: 4,
            user_agent: "Mozilla/5.0 (Macintosh) AutoLogin/1.0".to_string(),
            log_file: PathBuf::from("/tmp/portal_autologin.log"),
            secret_backend: SecretBackendKind::default(),
            username_service: "campus_net_user".to_string(),
            password_service: "campus_net_pass".to_string(),
        }
    }
}

impl AutologinConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults. The result is validated.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.probe_endpoints.is_empty() {
            anyhow::bail!("At least one probe endpoint must be configured");
        }
        for endpoint in &self.probe_endpoints {
            let parsed = url::Url::parse(&endpoint.url)
                .with_context(|| format!("Invalid probe endpoint URL: {}", endpoint.url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Probe endpoint must use http or https: {}", endpoint.url);
            }
            if let ProbeExpectation::Body(marker) = &endpoint.expect {
                if marker.is_empty() {
                    anyhow::bail!("Probe endpoint body marker cannot be empty: {}", endpoint.url);
                }
            }
        }

        if self.success_markers.iter().any(|m| m.trim().is_empty()) {
            anyhow::bail!("Success markers cannot be empty strings");
        }

        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be greater than zero");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.backoff_unit_secs == 0 {
            anyhow::bail!("backoff_unit_secs must be greater than zero");
        }

        if self.username_service.trim().is_empty() || self.password_service.trim().is_empty() {
            anyhow::bail!("Secret store service names must be specified");
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_unit_secs.saturating_mul(u64::from(attempt)))
    }

    /// Upper bound on one run's wall-clock time.
    ///
    /// A probe costs at most two timed-out GETs per endpoint. Each attempt is
    /// a page fetch, a POST and a re-probe. Backoff is slept between attempts.
    pub fn worst_case_runtime(&self) -> Duration {
        let timeout = self.http_timeout();
        let endpoints = self.probe_endpoints.len() as u32;
        let probe = timeout * 2 * endpoints;
        let attempt = timeout * 2 + probe;
        let backoff: Duration = (1..self.max_attempts).map(|n| self.backoff_for(n)).sum();
        probe + attempt * self.max_attempts + backoff
    }
}
