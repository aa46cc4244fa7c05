//! Integration registry - builds the configured integration instances.

use crate::connectors::drip::config::DripSettings;
use crate::connectors::drip::DripIntegration;
use crate::Integration;
use anyhow::{Context, Result};
use formsync::config::{FormsyncConfig, IntegrationConfig};
use formsync::credentials::TokenStore;
use formsync::integration::{ConfiguredFieldMapping, IntegrationContext};
use formsync::tokens::StoredTokenProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds one instance per configured integration.
///
/// Entries naming an unknown provider are skipped. Invalid credentials on a
/// known provider fail the whole build.
pub fn build_integrations(
    config: &FormsyncConfig,
    store: Arc<TokenStore>,
) -> Result<Vec<Arc<dyn Integration>>> {
    let mut integrations: Vec<Arc<dyn Integration>> = Vec::new();

    for (handle, integration) in &config.integrations {
        match integration.provider(handle) {
            "drip" => {
                let drip = build_drip(handle, integration, Arc::clone(&store))
                    .with_context(|| format!("Failed to build integration '{}'", handle))?;
                integrations.push(drip);
            }
            other => {
                warn!(integration = %handle, provider = %other, "Unknown provider, skipping");
            }
        }
    }

    info!(count = integrations.len(), "Integrations built");
    Ok(integrations)
}

fn build_drip(
    handle: &str,
    config: &IntegrationConfig,
    store: Arc<TokenStore>,
) -> Result<Arc<dyn Integration>> {
    let settings = DripSettings::from_config(handle, config)?;
    let tokens = Arc::new(StoredTokenProvider::new(
        handle.to_string(),
        store,
        settings.oauth_config().token_url,
        settings.client_id.clone(),
        settings.client_secret.clone(),
    ));
    let mapper = Arc::new(ConfiguredFieldMapping::new(config.field_mapping.clone()));
    let context = IntegrationContext::new(tokens, mapper);

    info!(integration = %handle, base_url = %settings.base_url, "Drip integration configured");
    Ok(Arc::new(DripIntegration::new(
        handle.to_string(),
        settings,
        context,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn store() -> Arc<TokenStore> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Arc::new(TokenStore::new(":memory:", &STANDARD.encode([0u8; 32])).unwrap())
    }

    fn drip_config(client_id: &str) -> IntegrationConfig {
        IntegrationConfig {
            client_id: client_id.to_string(),
            client_secret: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_configured_drip() {
        let config = FormsyncConfig {
            integrations: BTreeMap::from([("drip".to_string(), drip_config("cid"))]),
            ..Default::default()
        };

        let integrations = build_integrations(&config, store()).unwrap();
        assert_eq!(integrations.len(), 1);
        assert_eq!(integrations[0].handle(), "drip");
        assert_eq!(integrations[0].display_name(), "Drip");
        assert_eq!(integrations[0].client_id(), "cid");
    }

    #[test]
    fn test_named_instances_use_provider() {
        let mut newsletter = drip_config("cid");
        newsletter.provider = Some("drip".to_string());
        let config = FormsyncConfig {
            integrations: BTreeMap::from([("newsletter".to_string(), newsletter)]),
            ..Default::default()
        };

        let integrations = build_integrations(&config, store()).unwrap();
        assert_eq!(integrations[0].handle(), "newsletter");
        assert_eq!(integrations[0].display_name(), "Drip");
    }

    #[test]
    fn test_unknown_provider_skipped() {
        let config = FormsyncConfig {
            integrations: BTreeMap::from([
                ("drip".to_string(), drip_config("cid")),
                ("mailchimp".to_string(), drip_config("cid")),
            ]),
            ..Default::default()
        };

        let integrations = build_integrations(&config, store()).unwrap();
        assert_eq!(integrations.len(), 1);
        assert_eq!(integrations[0].handle(), "drip");
    }

    #[test]
    fn test_missing_credentials_fail_build() {
        let config = FormsyncConfig {
            integrations: BTreeMap::from([("drip".to_string(), drip_config(""))]),
            ..Default::default()
        };

        let err = build_integrations(&config, store()).err().unwrap();
        assert!(format!("{:#}", err).contains("client_id"));
    }

    #[test]
    fn test_no_integrations_configured() {
        let integrations = build_integrations(&FormsyncConfig::default(), store()).unwrap();
        assert!(integrations.is_empty());
    }
}
