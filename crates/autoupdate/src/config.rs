//! Configuration for update checks and downloads.

use crate::compression::Compression;
use crate::error::ConfigError;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// How HTTP clients are built for direct and proxied traffic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Forward proxy used when a caller asks for proxied traffic
    /// (e.g. `http://127.0.0.1:8787`).
    pub address: Option<String>,
    /// Basic auth credentials for the proxy; both or neither.
    pub username: Option<String>,
    /// Basic auth password for the proxy.
    pub password: Option<String>,
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds, body transfer included.
    pub timeout_secs: Option<u64>,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            address: None,
            username: None,
            password: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: None,
            user_agent: None,
        }
    }
}

impl ProxyConfig {
    /// Set the forward proxy address
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Authenticate against the proxy with basic auth
    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the whole-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Connection establishment timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Where release manifests are published and the key that signs them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseChannel {
    /// Endpoint serving the signed manifest.
    pub manifest_url: String,
    /// Ed25519 public key, hex or base64 encoded.
    pub public_key: String,
}

impl ReleaseChannel {
    /// Create a channel from a manifest URL and an encoded public key.
    pub fn new(manifest_url: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            public_key: public_key.into(),
        }
    }

    /// Decode the public key into the raw trust anchor bytes.
    pub fn trust_anchor(&self) -> Result<Vec<u8>, ConfigError> {
        let key = self.public_key.trim();
        if key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit()) {
            return hex::decode(key).map_err(|err| ConfigError::InvalidKey(err.to_string()));
        }

        general_purpose::STANDARD
            .decode(key.as_bytes())
            .map_err(|err| ConfigError::InvalidKey(format!("neither hex nor base64: {err}")))
    }
}

/// Top level updater configuration, usually loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdaterConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub channel: ReleaseChannel,
    /// Compression applied to published payloads.
    #[serde(default)]
    pub compression: Compression,
}

impl UpdaterConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
