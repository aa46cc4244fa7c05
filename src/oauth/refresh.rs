//! Refresh-token grant.

use crate::credentials::Token;
use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use serde::Deserialize;

/// Token endpoint response (standard OAuth 2.0 fields only).
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges a refresh token for a new access token.
///
/// The returned token carries the provider's new refresh token only if the
/// provider rotated it; callers decide whether to keep the old one.
///
/// # Errors
/// Transport failures, non-2xx responses (status and body are included in
/// the message) and unparseable responses.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    token_url: &str,
    refresh_token: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<Token> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ];

    tracing::debug!(token_url = %token_url, "Requesting token refresh");

    let response = http
        .post(token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .context("Failed to send token refresh request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        bail!("Token refresh failed with status {}: {}", status, body);
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token refresh response")?;

    Ok(Token {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_refresh_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "r1".into()),
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"a2","refresh_token":"r2","expires_in":7200}"#)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let token = refresh_access_token(
            &http,
            &format!("{}/oauth/token", server.url()),
            "r1",
            "cid",
            "secret",
        )
        .await
        .unwrap();

        assert_eq!(token.access_token, "a2");
        assert_eq!(token.refresh_token.as_deref(), Some("r2"));
        assert!(token.expires_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_minimal_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"a2"}"#)
            .create_async()
            .await;

        let token = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{}/oauth/token", server.url()),
            "r1",
            "cid",
            "secret",
        )
        .await
        .unwrap();

        assert_eq!(token.access_token, "a2");
        assert!(token.refresh_token.is_none());
        assert!(token.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let err = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{}/oauth/token", server.url()),
            "revoked",
            "cid",
            "secret",
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("invalid_grant"));
    }
}
