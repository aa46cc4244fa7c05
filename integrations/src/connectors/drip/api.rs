//! Authenticated request executor for the Drip REST API.
//!
//! The client is built lazily on first use and validated eagerly with a cheap
//! `GET accounts` probe. Token expiry is never checked locally: a 401 from the
//! probe is the only signal that the token is bad. It triggers exactly one
//! forced refresh, after which the client is rebuilt with whatever token the
//! provider now holds.
//!
//! ```text
//!   Unbuilt ──build + probe──▶ Valid
//!      │                        ▲
//!      └─probe 401─▶ Repairing ─┘  (forced refresh, rebuild, no second probe)
//! ```

use anyhow::{Context, Result};
use formsync::credentials::Token;
use formsync::tokens::TokenProvider;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Endpoint used to validate a freshly built client.
const PROBE_PATH: &str = "accounts";

/// Non-2xx response from the Drip API.
#[derive(Debug)]
pub struct ApiStatusError {
    pub status: StatusCode,
    pub body: String,
}

impl fmt::Display for ApiStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Drip API error {}: {}", self.status, self.body)
    }
}

impl std::error::Error for ApiStatusError {}

/// Returns true if the error is an authorization failure (HTTP 401).
pub fn is_auth_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiStatusError>()
        .map_or(false, |e| e.status == StatusCode::UNAUTHORIZED)
}

/// HTTP status of a failed call, if the remote answered at all.
pub fn error_status(err: &anyhow::Error) -> Option<StatusCode> {
    err.downcast_ref::<ApiStatusError>().map(|e| e.status)
}

/// HTTP client bound to the base URL and one bearer token.
#[derive(Clone)]
struct AuthorizedClient {
    http: Client,
    base_url: String,
}

impl AuthorizedClient {
    fn new(base_url: &str, token: &Token) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .context("Access token is not a valid header value")?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent("formsync/1.0")
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_matches('/'));
        debug!(method = %method, url = %url, "Drip API request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} {}", method, url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Drip API response")?;

        if !status.is_success() {
            return Err(ApiStatusError { status, body: text }.into());
        }

        serde_json::from_str(&text).context("Failed to decode Drip API response")
    }
}

enum ClientState {
    Unbuilt,
    Valid(AuthorizedClient),
    Repairing(Token),
}

/// Self-healing Drip API client for one integration instance.
pub struct DripClient {
    handle: String,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    state: Mutex<ClientState>,
}

impl DripClient {
    pub fn new(handle: String, base_url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            handle,
            base_url,
            tokens,
            state: Mutex::new(ClientState::Unbuilt),
        }
    }

    async fn current_token(&self) -> Result<Token> {
        Ok(self.tokens.get_token().await?.unwrap_or_else(|| {
            warn!(integration = %self.handle, "No token stored, using empty bearer token");
            Token::empty()
        }))
    }

    /// Returns the cached client, building and validating it on first use.
    async fn ensure_client(&self) -> Result<AuthorizedClient> {
        let mut state = self.state.lock().await;
        loop {
            let next = match &*state {
                ClientState::Valid(client) => return Ok(client.clone()),
                ClientState::Unbuilt => {
                    let token = self.current_token().await?;
                    let client = AuthorizedClient::new(&self.base_url, &token)?;
                    match client.request(Method::GET, PROBE_PATH, None).await {
                        Err(e) if is_auth_error(&e) => {
                            info!(integration = %self.handle, "Access token rejected, forcing refresh");
                            ClientState::Repairing(token)
                        }
                        Err(e) => {
                            // Surfaces again on the real call
                            debug!(integration = %self.handle, error = %e, "Client probe failed");
                            ClientState::Valid(client)
                        }
                        Ok(_) => ClientState::Valid(client),
                    }
                }
                ClientState::Repairing(token) => {
                    // Leave Repairing first: a failed rebuild must not refresh again
                    let token = token.clone();
                    *state = ClientState::Unbuilt;
                    if let Err(e) = self.tokens.refresh_token(&token, true).await {
                        warn!(
                            integration = %self.handle,
                            error = %e,
                            "Forced token refresh failed, continuing with current token"
                        );
                    }
                    let token = self.current_token().await?;
                    ClientState::Valid(AuthorizedClient::new(&self.base_url, &token)?)
                }
            };
            *state = next;
        }
    }

    /// Issues one request and decodes the JSON response.
    ///
    /// Leading and trailing slashes of `path` are ignored. Errors are
    /// returned as-is; nothing is retried here.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let client = self.ensure_client().await?;
        client.request(method, path, body).await
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }
}
