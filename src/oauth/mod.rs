//! OAuth 2.0 endpoints of integration providers.
//!
//! The authorization-code exchange happens upstream; this module only knows
//! how to point a user at a provider's consent page and how to renew an
//! access token with a refresh token.

mod refresh;

pub use refresh::refresh_access_token;

use serde::{Deserialize, Serialize};

/// OAuth configuration of an integration provider.
///
/// # Example
/// ```
/// use formsync::oauth::OAuthConfig;
///
/// let config = OAuthConfig {
///     auth_url: "https://www.getdrip.com/oauth/authorize".to_string(),
///     token_url: "https://www.getdrip.com/oauth/token".to_string(),
///     scopes: vec![],
/// };
/// let url = config.authorize_url("client", "http://localhost/cb", "xyz");
/// assert!(url.starts_with("https://www.getdrip.com/oauth/authorize?"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Authorization endpoint URL
    pub auth_url: String,

    /// Token endpoint URL (code exchange and refresh)
    pub token_url: String,

    /// Scopes to request; empty for providers without scopes
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Builds the authorization URL a user is redirected to.
    ///
    /// `scope` is left out entirely when no scopes are configured.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str, state: &str) -> String {
        let mut url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}",
            self.auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
        );
        if !self.scopes.is_empty() {
            url.push_str("&scope=");
            url.push_str(&urlencoding::encode(&self.scopes.join(" ")));
        }
        url.push_str("&state=");
        url.push_str(&urlencoding::encode(state));
        url
    }
}
