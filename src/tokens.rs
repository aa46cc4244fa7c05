//! Token provider: the source of bearer tokens for integration instances.
//!
//! Integrations never read the token store directly. They ask a
//! [`TokenProvider`] for the current token and, when the remote API rejects
//! it, ask for a forced refresh.

use crate::credentials::{Token, TokenStore};
use crate::oauth::refresh_access_token;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Tokens expiring within this window are renewed on a non-forced refresh.
const REFRESH_THRESHOLD_SECS: i64 = 90;

/// Supplies the current bearer token for one integration instance.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current token, which may already be stale.
    ///
    /// `Ok(None)` means the integration has not been connected yet.
    async fn get_token(&self) -> Result<Option<Token>>;

    /// Renews `token` and replaces it in shared storage.
    ///
    /// With `force = false` a token that is not about to expire is left
    /// alone; `force = true` always contacts the authorization server.
    async fn refresh_token(&self, token: &Token, force: bool) -> Result<()>;
}

/// [`TokenProvider`] backed by the encrypted [`TokenStore`] and the
/// provider's refresh-token grant.
pub struct StoredTokenProvider {
    integration: String,
    store: Arc<TokenStore>,
    token_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl StoredTokenProvider {
    pub fn new(
        integration: String,
        store: Arc<TokenStore>,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            integration,
            store,
            token_url,
            client_id,
            client_secret,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn get_token(&self) -> Result<Option<Token>> {
        self.store
            .get(&self.integration)
            .with_context(|| format!("Failed to load token for {}", self.integration))
    }

    async fn refresh_token(&self, token: &Token, force: bool) -> Result<()> {
        if !force && !token.expires_within(REFRESH_THRESHOLD_SECS) {
            return Ok(());
        }

        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| anyhow!("No refresh token stored for {}", self.integration))?;

        info!(integration = %self.integration, force, "Refreshing OAuth token");

        let mut renewed = refresh_access_token(
            &self.http,
            &self.token_url,
            refresh_token,
            &self.client_id,
            &self.client_secret,
        )
        .await?;

        // Keep the existing refresh token if the provider did not rotate it
        if renewed.refresh_token.is_none() {
            renewed.refresh_token = token.refresh_token.clone();
        }

        self.store
            .store(&self.integration, &renewed)
            .context("Failed to persist refreshed token")?;

        info!(integration = %self.integration, "OAuth token refreshed");
        Ok(())
    }
}
