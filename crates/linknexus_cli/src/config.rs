use std::path::Path;

use anyhow::{Context, Result};
use linknexus_contract::Credentials;
use linknexus_transfer::{DEFAULT_RELAY_LIMIT_BYTES, OFFICIAL_API_LIMIT_BYTES};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8787";

/// Settings read by `upload` and `history`. The `[telegram]` section is the
/// local credential record; leaving it empty sends everything via the relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub telegram: Credentials,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub describe: DescribeSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySection {
    #[serde(default = "default_relay_url")]
    pub base_url: String,
    #[serde(default = "default_relay_limit")]
    pub limit_bytes: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            base_url: default_relay_url(),
            limit_bytes: default_relay_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescribeSection {
    #[serde(default)]
    pub enabled: bool,
    pub model: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub http: HttpSection,
    pub storage: StorageSection,
    #[serde(default)]
    pub upstream: Credentials,
    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub sqlite_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_relay_limit")]
    pub upload_limit_bytes: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            upload_limit_bytes: default_relay_limit(),
        }
    }
}

impl RelayConfig {
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.upstream.bot_token.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.upstream.bot_token = lookup(BOT_TOKEN_ENV);
        }
        if self.upstream.chat_id.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.upstream.chat_id = lookup(CHAT_ID_ENV);
        }
    }

    // the relay forwards to the public endpoint, so it stays under that ceiling
    pub fn upload_limit_bytes(&self) -> u64 {
        let ceiling = OFFICIAL_API_LIMIT_BYTES - 1;
        if self.limits.upload_limit_bytes > ceiling {
            warn!(
                configured = self.limits.upload_limit_bytes,
                ceiling, "relay upload limit lowered to the public Bot API ceiling"
            );
            return ceiling;
        }
        self.limits.upload_limit_bytes
    }
}

pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("invalid config TOML at {}", path.display()))
}

/// A missing client config is not an error: uploads then go through the
/// default relay.
pub fn load_client(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "client config not found, using defaults");
        return Ok(ClientConfig::default());
    }
    load(path)
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_relay_limit() -> u64 {
    DEFAULT_RELAY_LIMIT_BYTES
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use linknexus_transfer::{DEFAULT_RELAY_LIMIT_BYTES, OFFICIAL_API_LIMIT_BYTES};

    use super::{load, load_client, ClientConfig, RelayConfig, BOT_TOKEN_ENV, CHAT_ID_ENV};

    #[test]
    fn client_config_reads_credentials_and_relay() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
[telegram]
bot_token = "123:abc"
chat_id = "-1001"
api_root = "http://127.0.0.1:8081/"

[relay]
base_url = "https://relay.example"

[describe]
enabled = true
"#
        )
        .expect("write config");

        let config: ClientConfig = load(file.path()).expect("parse");
        assert_eq!(config.telegram.direct_pair(), Some(("123:abc", "-1001")));
        assert_eq!(config.telegram.api_root(), "http://127.0.0.1:8081");
        assert_eq!(config.relay.base_url, "https://relay.example");
        assert_eq!(config.relay.limit_bytes, DEFAULT_RELAY_LIMIT_BYTES);
        assert!(config.describe.enabled);
    }

    #[test]
    fn missing_client_config_means_relay_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_client(&dir.path().join("absent.toml")).expect("defaults");
        assert!(config.telegram.direct_pair().is_none());
        assert_eq!(config.relay.base_url, "http://127.0.0.1:8787");
    }

    #[test]
    fn relay_config_falls_back_to_env_and_caps_limit() {
        let mut config: RelayConfig = toml::from_str(
            r#"
[http]
bind = "127.0.0.1:8787"

[storage]
sqlite_path = "data/relay.db"

[upstream]
chat_id = "-1009"

[limits]
upload_limit_bytes = 104857600
"#,
        )
        .expect("parse");

        config.apply_env(|key| match key {
            BOT_TOKEN_ENV => Some("env-token".to_string()),
            CHAT_ID_ENV => Some("env-chat".to_string()),
            _ => None,
        });

        assert_eq!(config.upstream.direct_pair(), Some(("env-token", "-1009")));
        assert_eq!(config.upload_limit_bytes(), OFFICIAL_API_LIMIT_BYTES - 1);
    }
}
