use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// This connector's own id, stamped on every outbound message header.
    #[serde(default = "default_connector_id")]
    pub connector_id: Url,
    /// Protocol model version advertised in outbound headers.
    #[serde(default = "default_model_version")]
    pub model_version: String,

    #[serde(default)]
    pub outbound: OutboundConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connector_id: default_connector_id(),
            model_version: default_model_version(),
            outbound: OutboundConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl ConnectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Loads the given path, or falls back to defaults when none is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

fn default_connector_id() -> Url {
    // Static literal, known valid.
    Url::parse("https://localhost/dsx/connector").expect("default connector id")
}

fn default_model_version() -> String {
    "4.0.0".to_string()
}

// ── Outbound transport ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

// ── Caller-facing gateway ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    120
}

// ── Store backend ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = ConnectorConfig::default();
        assert_eq!(config.model_version, "4.0.0");
        assert_eq!(config.outbound.timeout_secs, 30);
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn parses_full_toml() {
        let raw = r#"
            connector_id = "https://consumer.example/connector"
            model_version = "4.2.0"

            [outbound]
            timeout_secs = 5

            [gateway]
            bind = "0.0.0.0:9090"

            [store]
            backend = "sqlite"
            path = "/var/lib/dsx/exchange.db"
        "#;
        let config: ConnectorConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.connector_id.as_str(), "https://consumer.example/connector");
        assert_eq!(config.model_version, "4.2.0");
        assert_eq!(config.outbound.timeout_secs, 5);
        assert_eq!(config.gateway.bind, "0.0.0.0:9090");
        assert!(matches!(config.store, StoreConfig::Sqlite { .. }));
    }

    #[test]
    fn empty_toml_falls_back_to_defaults() {
        let config: ConnectorConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.bind, "127.0.0.1:8080");
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = ConnectorConfig::load(Path::new("/nonexistent/dsx.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
