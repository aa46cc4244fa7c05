//! Integration HTTP API.
//!
//! Exposes four routes:
//! - `GET /api/integrations` - list configured integrations
//! - `GET /api/integrations/:handle/settings` - discover lists and fields
//! - `POST /api/integrations/:handle/submissions` - push one submission
//! - `PUT /api/integrations/:handle/token` - store an OAuth token

use crate::Integration;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{Duration, Utc};
use formsync::config::FormsyncConfig;
use formsync::credentials::{Token, TokenStore};
use formsync::integration::{FormSettings, Submission};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the integration API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub integrations: Vec<Arc<dyn Integration>>,
    pub token_store: Arc<TokenStore>,
    pub config: Arc<FormsyncConfig>,
}

impl ApiState {
    fn integration(&self, handle: &str) -> Result<&Arc<dyn Integration>, AppError> {
        self.integrations
            .iter()
            .find(|i| i.handle() == handle)
            .ok_or_else(|| AppError::NotFound(format!("Unknown integration '{}'", handle)))
    }

    fn redirect_uri(&self, handle: &str) -> String {
        self.config
            .integrations
            .get(handle)
            .and_then(|c| c.redirect_uri.clone())
            .unwrap_or_else(|| {
                format!(
                    "http://localhost:{}/oauth/{}/callback",
                    self.config.server.port, handle
                )
            })
    }
}

/// A single entry in the `GET /api/integrations` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct IntegrationInfo {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub authorize_url: String,
    pub connected: bool,
}

/// Request body for `PUT /api/integrations/:handle/token`.
#[derive(Debug, Deserialize)]
pub struct StoreTokenRequest {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds from now.
    pub expires_in: Option<i64>,
}

impl StoreTokenRequest {
    fn into_token(self) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        }
    }
}

/// Response for `POST /api/integrations/:handle/submissions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// Business logic (called from HTTP handlers and unit tests)
// ---------------------------------------------------------------------------

/// Lists every integration with its authorize URL and connection status.
///
/// An integration is connected when a token is stored under its handle.
pub fn handle_list_integrations(state: &ApiState) -> Result<Vec<IntegrationInfo>> {
    let connected = state.token_store.list()?;

    Ok(state
        .integrations
        .iter()
        .map(|integration| {
            let handle = integration.handle();
            let authorize_url = integration.oauth_config().authorize_url(
                integration.client_id(),
                &state.redirect_uri(handle),
                handle,
            );
            IntegrationInfo {
                handle: handle.to_string(),
                name: integration.display_name().to_string(),
                description: integration.description().to_string(),
                authorize_url,
                connected: connected.iter().any(|c| c == handle),
            }
        })
        .collect())
}

/// Stores a token obtained by the OAuth flow for one integration.
pub fn handle_store_token(state: &ApiState, handle: &str, req: StoreTokenRequest) -> Result<()> {
    state.token_store.store(handle, &req.into_token())?;
    info!(integration = %handle, "Token stored");
    Ok(())
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

async fn list_integrations(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<IntegrationInfo>>, AppError> {
    let integrations = handle_list_integrations(&state)?;
    Ok(Json(integrations))
}

async fn get_settings(
    State(state): State<Arc<ApiState>>,
    Path(handle): Path<String>,
) -> Result<Json<FormSettings>, AppError> {
    let integration = state.integration(&handle)?;
    let settings = integration.fetch_form_settings().await;
    if settings.is_empty() {
        warn!(integration = %handle, "No form settings discovered");
    }
    Ok(Json(settings))
}

async fn post_submission(
    State(state): State<Arc<ApiState>>,
    Path(handle): Path<String>,
    Json(submission): Json<Submission>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let integration = state.integration(&handle)?;
    let success = integration.send_payload(&submission).await;
    info!(
        integration = %handle,
        submission = %submission.id,
        success = success,
        "Submission processed"
    );
    Ok(Json(SubmissionResponse { success }))
}

async fn put_token(
    State(state): State<Arc<ApiState>>,
    Path(handle): Path<String>,
    Json(req): Json<StoreTokenRequest>,
) -> Result<StatusCode, AppError> {
    state.integration(&handle)?;
    handle_store_token(&state, &handle, req)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

enum AppError {
    NotFound(String),
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/integrations", get(list_integrations))
        .route("/api/integrations/:handle/settings", get(get_settings))
        .route(
            "/api/integrations/:handle/submissions",
            post(post_submission),
        )
        .route("/api/integrations/:handle/token", put(put_token))
        .with_state(Arc::new(state))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::build_integrations;
    use formsync::config::IntegrationConfig;
    use std::collections::BTreeMap;

    fn make_state() -> ApiState {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        let token_store = Arc::new(TokenStore::new(":memory:", &STANDARD.encode([0u8; 32])).unwrap());
        let config = FormsyncConfig {
            integrations: BTreeMap::from([(
                "drip".to_string(),
                IntegrationConfig {
                    client_id: "cid".to_string(),
                    client_secret: "secret".to_string(),
                    redirect_uri: Some("https://forms.example.com/oauth/drip".to_string()),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        };
        let integrations = build_integrations(&config, Arc::clone(&token_store)).unwrap();
        ApiState {
            integrations,
            token_store,
            config: Arc::new(config),
        }
    }

    #[test]
    fn test_list_integrations_before_connect() {
        let state = make_state();
        let list = handle_list_integrations(&state).unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].handle, "drip");
        assert_eq!(list[0].name, "Drip");
        assert!(!list[0].connected);
        assert!(list[0]
            .authorize_url
            .starts_with("https://www.getdrip.com/oauth/authorize?"));
        assert!(list[0].authorize_url.contains("client_id=cid"));
        assert!(list[0]
            .authorize_url
            .contains("redirect_uri=https%3A%2F%2Fforms.example.com%2Foauth%2Fdrip"));
    }

    #[test]
    fn test_store_token_marks_connected() {
        let state = make_state();
        handle_store_token(
            &state,
            "drip",
            StoreTokenRequest {
                access_token: "abc".to_string(),
                refresh_token: Some("r1".to_string()),
                expires_in: Some(3600),
            },
        )
        .unwrap();

        let stored = state.token_store.get("drip").unwrap().unwrap();
        assert_eq!(stored.access_token, "abc");
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
        assert!(!stored.expires_within(60));
        assert!(stored.expires_within(7200));

        let list = handle_list_integrations(&state).unwrap();
        assert!(list[0].connected);
    }

    #[test]
    fn test_default_redirect_uri_uses_port() {
        let mut state = make_state();
        let mut config = (*state.config).clone();
        if let Some(drip) = config.integrations.get_mut("drip") {
            drip.redirect_uri = None;
        }
        state.config = Arc::new(config);

        assert_eq!(
            state.redirect_uri("drip"),
            "http://localhost:3001/oauth/drip/callback"
        );
    }
}
