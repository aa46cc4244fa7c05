use anyhow::Result;
use formsync::config::IntegrationConfig;
use formsync::oauth::OAuthConfig;

pub const BASE_URL: &str = "https://api.getdrip.com/v2/";
pub const AUTH_URL: &str = "https://www.getdrip.com/oauth/authorize";
pub const TOKEN_URL: &str = "https://www.getdrip.com/oauth/token";

pub const DISPLAY_NAME: &str = "Drip";
pub const DESCRIPTION: &str =
    "Sign up users to your Drip lists to grow your audience for campaigns.";

/// Drip instance settings, validated when the instance is built.
#[derive(Debug, Clone)]
pub struct DripSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl DripSettings {
    /// Builds settings from the instance configuration.
    ///
    /// Fails if the client ID or secret is missing.
    pub fn from_config(handle: &str, config: &IntegrationConfig) -> Result<Self> {
        config.validate(handle)?;
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| BASE_URL.to_string()),
        })
    }

    /// Drip does not use OAuth scopes.
    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            scopes: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(client_id: &str, client_secret: &str) -> IntegrationConfig {
        IntegrationConfig {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(BASE_URL, "https://api.getdrip.com/v2/");
        assert_eq!(AUTH_URL, "https://www.getdrip.com/oauth/authorize");
        assert_eq!(TOKEN_URL, "https://www.getdrip.com/oauth/token");
    }

    #[test]
    fn test_from_config_defaults_base_url() {
        let settings = DripSettings::from_config("drip", &config("id", "secret")).unwrap();
        assert_eq!(settings.client_id, "id");
        assert_eq!(settings.client_secret, "secret");
        assert_eq!(settings.base_url, BASE_URL);
    }

    #[test]
    fn test_from_config_custom_base_url() {
        let mut cfg = config("id", "secret");
        cfg.base_url = Some("http://127.0.0.1:9999".to_string());
        let settings = DripSettings::from_config("drip", &cfg).unwrap();
        assert_eq!(settings.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let err = DripSettings::from_config("drip", &config("", "secret")).unwrap_err();
        assert!(err.to_string().contains("client_id"));

        let err = DripSettings::from_config("drip", &config("id", "")).unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn test_oauth_config() {
        let settings = DripSettings::from_config("drip", &config("id", "secret")).unwrap();
        let oauth = settings.oauth_config();
        assert_eq!(oauth.auth_url, AUTH_URL);
        assert_eq!(oauth.token_url, TOKEN_URL);
        assert!(oauth.scopes.is_empty());
    }
}
