pub mod api;
pub mod config;
pub mod payload;

use crate::Integration;
use anyhow::{Context, Result};
use async_trait::async_trait;
use formsync::integration::{
    EmailMarketingList, FormSettings, IntegrationContext, IntegrationField, Submission,
};
use formsync::oauth::OAuthConfig;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use self::api::{error_status, DripClient};
use self::config::{DripSettings, DESCRIPTION, DISPLAY_NAME};
use self::payload::build_payload;

/// Drip integration: discovers custom fields and adds or updates subscribers.
///
/// Drip has no list concept exposed here; every account gets one synthetic
/// "All Subscribers" list.
pub struct DripIntegration {
    handle: String,
    settings: DripSettings,
    client: DripClient,
    context: IntegrationContext,
}

impl DripIntegration {
    pub fn new(handle: String, settings: DripSettings, context: IntegrationContext) -> Self {
        let client = DripClient::new(
            handle.clone(),
            settings.base_url.clone(),
            Arc::clone(&context.tokens),
        );
        Self {
            handle,
            settings,
            client,
            context,
        }
    }

    /// First account of the authorized user.
    ///
    /// An empty account list yields `""`; the following request then fails
    /// remotely instead of here.
    async fn account_id(&self) -> Result<String> {
        let response = self.client.get("accounts").await?;
        let id = match &response["accounts"][0]["id"] {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => String::new(),
        };
        if id.is_empty() {
            warn!(integration = %self.handle, "Drip returned no accounts");
        }
        Ok(id)
    }

    async fn discover(&self) -> Result<FormSettings> {
        let account_id = self.account_id().await?;
        let response = self
            .client
            .get(&format!("{}/custom_field_identifiers", account_id))
            .await?;

        let custom_fields: Vec<&str> = response["custom_field_identifiers"]
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = standard_fields();
        fields.extend(
            custom_fields
                .into_iter()
                .map(|id| IntegrationField::new(id, id)),
        );

        Ok(FormSettings {
            lists: vec![EmailMarketingList {
                id: "all".to_string(),
                name: "All Subscribers".to_string(),
                fields,
            }],
        })
    }

    async fn send(&self, submission: &Submission) -> Result<bool> {
        let values = self.context.field_mapper.field_mapping_values(submission);
        let payload = serde_json::to_value(build_payload(&values))
            .context("Failed to encode subscriber payload")?;

        if !self.context.hooks.before_send_payload(submission, &payload) {
            info!(
                integration = %self.handle,
                submission = %submission.id,
                "Send cancelled by hook"
            );
            return Ok(false);
        }

        let account_id = self.account_id().await?;
        let response = self
            .client
            .post(&format!("{}/subscribers", account_id), &payload)
            .await?;

        if !self
            .context
            .hooks
            .after_send_payload(submission, &payload, &response)
        {
            info!(
                integration = %self.handle,
                submission = %submission.id,
                "Response rejected by hook"
            );
            return Ok(false);
        }

        let subscriber_id = match &response["subscribers"][0]["id"] {
            Value::String(id) if !id.is_empty() => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => {
                self.context.log.error(
                    &self.handle,
                    &format!("API error: \u{201c}{}\u{201d}", response),
                    true,
                );
                return Ok(false);
            }
        };

        info!(
            integration = %self.handle,
            submission = %submission.id,
            subscriber = %subscriber_id,
            "Subscriber synced"
        );
        Ok(true)
    }

    fn log_api_error(&self, err: &anyhow::Error) {
        warn!(
            integration = %self.handle,
            status = ?error_status(err).map(|s| s.as_u16()),
            error = %err,
            "Drip API call failed"
        );
        self.context.log.error(
            &self.handle,
            &format!("API error: \u{201c}{:#}\u{201d}", err),
            true,
        );
    }
}

/// The ten subscriber fields Drip always accepts.
fn standard_fields() -> Vec<IntegrationField> {
    vec![
        IntegrationField::new("email", "Email").required(),
        IntegrationField::new("first_name", "First Name"),
        IntegrationField::new("last_name", "Last Name"),
        IntegrationField::new("address1", "Address 1"),
        IntegrationField::new("address2", "Address 2"),
        IntegrationField::new("city", "City"),
        IntegrationField::new("state", "State"),
        IntegrationField::new("zip", "Zip"),
        IntegrationField::new("country", "Country"),
        IntegrationField::new("phone", "Phone"),
    ]
}

#[async_trait]
impl Integration for DripIntegration {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn oauth_config(&self) -> OAuthConfig {
        self.settings.oauth_config()
    }

    fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    async fn fetch_form_settings(&self) -> FormSettings {
        match self.discover().await {
            Ok(settings) => settings,
            Err(e) => {
                self.log_api_error(&e);
                FormSettings::default()
            }
        }
    }

    async fn send_payload(&self, submission: &Submission) -> bool {
        match self.send(submission).await {
            Ok(sent) => sent,
            Err(e) => {
                self.log_api_error(&e);
                false
            }
        }
    }
}
