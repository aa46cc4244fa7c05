//! Service configuration.
//!
//! Loaded from a TOML file; every section falls back to defaults. Secrets may
//! be supplied through the environment instead of the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Complete formsync configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormsyncConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Integration instances keyed by handle
    #[serde(default)]
    pub integrations: BTreeMap<String, IntegrationConfig>,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Token storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_tokens_db")]
    pub tokens_db: String,
}

fn default_tokens_db() -> String {
    "tokens.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tokens_db: default_tokens_db(),
        }
    }
}

/// One integration instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationConfig {
    /// Integration type; defaults to the instance handle
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Overrides the provider's API endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Where the provider sends users back after authorizing
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Integration field handle → submission field handle
    #[serde(default)]
    pub field_mapping: BTreeMap<String, String>,
}

impl IntegrationConfig {
    /// Integration type of the instance called `handle`.
    pub fn provider<'a>(&'a self, handle: &'a str) -> &'a str {
        self.provider.as_deref().unwrap_or(handle)
    }

    /// Applies `FORMSYNC_{HANDLE}_CLIENT_ID` and `FORMSYNC_{HANDLE}_CLIENT_SECRET`.
    pub fn apply_env_overrides(&mut self, handle: &str) {
        let prefix = format!("FORMSYNC_{}", handle.to_uppercase().replace('-', "_"));
        if let Ok(v) = std::env::var(format!("{}_CLIENT_ID", prefix)) {
            self.client_id = v;
        }
        if let Ok(v) = std::env::var(format!("{}_CLIENT_SECRET", prefix)) {
            self.client_secret = v;
        }
    }

    /// Client ID and secret are both required.
    pub fn validate(&self, handle: &str) -> Result<()> {
        if self.client_id.trim().is_empty() {
            bail!("Integration '{}': client_id is required", handle);
        }
        if self.client_secret.trim().is_empty() {
            bail!("Integration '{}': client_secret is required", handle);
        }
        Ok(())
    }
}

impl FormsyncConfig {
    /// Applies process-level environment overrides (`FORMSYNC_PORT` and the
    /// per-integration client credentials).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FORMSYNC_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.server.port = port;
            }
        }
        for (handle, integration) in self.integrations.iter_mut() {
            integration.apply_env_overrides(handle);
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FormsyncConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = FormsyncConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.storage.tokens_db, "tokens.db");
        assert!(config.integrations.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            port = 8080

            [storage]
            tokens_db = "/var/lib/formsync/tokens.db"

            [integrations.drip]
            client_id = "cid"
            client_secret = "secret"
            base_url = "http://localhost:9000/v2/"

            [integrations.drip.field_mapping]
            email = "emailAddress"
            first_name = "firstName"
        "#;

        let config: FormsyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.tokens_db, "/var/lib/formsync/tokens.db");

        let drip = &config.integrations["drip"];
        assert_eq!(drip.provider("drip"), "drip");
        assert_eq!(drip.client_id, "cid");
        assert_eq!(drip.base_url.as_deref(), Some("http://localhost:9000/v2/"));
        assert_eq!(drip.field_mapping["email"], "emailAddress");
        assert!(drip.validate("drip").is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [integrations.newsletter]
            provider = "drip"
        "#;

        let config: FormsyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3001);
        let newsletter = &config.integrations["newsletter"];
        assert_eq!(newsletter.provider("newsletter"), "drip");
        assert!(newsletter.field_mapping.is_empty());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut integration = IntegrationConfig::default();
        let err = integration.validate("drip").unwrap_err();
        assert!(err.to_string().contains("client_id"));

        integration.client_id = "cid".to_string();
        let err = integration.validate("drip").unwrap_err();
        assert!(err.to_string().contains("client_secret"));

        integration.client_secret = "   ".to_string();
        assert!(integration.validate("drip").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("FORMSYNC_DRIP_CLIENT_ID", "env_id");
        std::env::set_var("FORMSYNC_DRIP_CLIENT_SECRET", "env_secret");
        std::env::set_var("FORMSYNC_PORT", "4000");

        let mut config: FormsyncConfig = toml::from_str(
            r#"
            [integrations.drip]
            client_id = "file_id"
            "#,
        )
        .unwrap();
        config.apply_env_overrides();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.integrations["drip"].client_id, "env_id");
        assert_eq!(config.integrations["drip"].client_secret, "env_secret");

        std::env::remove_var("FORMSYNC_DRIP_CLIENT_ID");
        std::env::remove_var("FORMSYNC_DRIP_CLIENT_SECRET");
        std::env::remove_var("FORMSYNC_PORT");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 5005").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 5005);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(load_config("/nonexistent/formsync.toml").is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
