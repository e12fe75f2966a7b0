//! AgoraPass service configuration
//!
//! TOML format, stored under the platform data directory by default. This
//! file carries deployment settings only: endpoints, chain parameters,
//! database path, logging. Secrets (the POD signing key) come from the
//! environment and are never written to disk; when a required key is
//! absent the corresponding route fails closed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding the POD signing key (hex private key)
pub const POD_SIGNING_KEY_ENV: &str = "AGORAPASS_POD_SIGNING_KEY";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgoraConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub chain: ChainConfig,

    pub relay: RelayConfig,

    pub identity: IdentityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the REST API
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database
    pub path: PathBuf,
}

/// Chain parameters: ids, contracts, schema UIDs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// JSON-RPC endpoint for season/quota reads
    pub rpc_url: String,
    /// EAS contract the typed data is bound to
    #[serde(default = "default_eas_contract")]
    pub eas_contract: String,
    /// Vouching season contract
    pub season_contract: String,
    /// Schema UID for standard vouches
    pub schema_uid: String,
    /// Schema UID for ticket-link attestations
    pub zupass_schema_uid: String,
    /// Attestation indexer GraphQL endpoint
    pub index_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the attestation relay (stamp API)
    pub base_url: String,
    /// App id header forwarded to the relay and issuance service
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's verification endpoint
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_eas_contract() -> String {
    agorapass::attestation::typed_data::EAS_CONTRACT.to_string()
}

fn default_app_id() -> String {
    "agora".to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Default config path: `<data dir>/agorapass/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agorapass")
        .join("config.toml")
}

impl AgoraConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: AgoraConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Write a commented default configuration
    pub fn create_default(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let data_dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::write(path, Self::generate_default_toml(data_dir))
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Default configuration content with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        format!(
            r#"# AgoraPass service configuration
#
# Deployment settings only. The POD signing key is read from the
# {key_env} environment variable and must not be placed here.

[server]
bind = "127.0.0.1:8080"

[database]
path = "{db_path}"

[chain]
chain_id = 84532
rpc_url = "https://sepolia.base.org"
eas_contract = "0x4200000000000000000000000000000000000021"
season_contract = "0x0000001513e2e9C7990Dcc8A7E99E0B4b32605fd"
schema_uid = "0xfbc2df315b41c1b399470f3f4e5ba5caa772a328bb75d1a20bb5dbac1e75e8e7"
zupass_schema_uid = "0x9075dee7661b8b445a2f0caa3fc96223b8cc2593c796c414aed93f43d022b0f9"
index_url = "https://base-sepolia.easscan.org/graphql"

[relay]
base_url = "https://stamp.example.org"
app_id = "agora"

[identity]
base_url = "https://auth.privy.io"

[logging]
# trace, debug, info, warn, error
level = "info"
"#,
            key_env = POD_SIGNING_KEY_ENV,
            db_path = data_dir.join("agorapass.db").display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_parses_back() {
        let toml_str = AgoraConfig::generate_default_toml(Path::new("/tmp"));
        let config: AgoraConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.chain.chain_id, 84532);
        assert_eq!(config.relay.app_id, "agora");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let toml_str = r#"
[database]
path = "/tmp/test.db"

[chain]
chain_id = 8453
rpc_url = "https://mainnet.base.org"
season_contract = "0x0000001513e2e9C7990Dcc8A7E99E0B4b32605fd"
schema_uid = "0x1111111111111111111111111111111111111111111111111111111111111111"
zupass_schema_uid = "0x2222222222222222222222222222222222222222222222222222222222222222"
index_url = "https://base.easscan.org/graphql"

[relay]
base_url = "https://stamp.example.org"

[identity]
base_url = "https://auth.privy.io"
"#;
        let config: AgoraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.relay.app_id, "agora");
        assert_eq!(
            config.chain.eas_contract,
            "0x4200000000000000000000000000000000000021"
        );
    }
}
