use async_trait::async_trait;
use formsync::integration::{FormSettings, Submission};
use formsync::oauth::OAuthConfig;

/// Email-marketing integration interface.
///
/// Every provider (Drip, ...) implements this trait. An instance is bound to
/// one configured integration handle and keeps whatever per-instance state it
/// needs (such as an authenticated HTTP client) for its whole lifetime.
///
/// # Lifecycle
/// 1. The registry builds the instance from configuration
/// 2. An administrator connects the account via OAuth (upstream)
/// 3. `fetch_form_settings()` is called when forms are being set up
/// 4. `send_payload()` is called once per form submission
///
/// # Error Handling
/// Neither operation returns errors. Failures are reported to the
/// instance's [`IntegrationLog`](formsync::integration::IntegrationLog) and
/// surface as empty settings or `false`.
#[async_trait]
pub trait Integration: Send + Sync {
    /// Handle of the configured instance (e.g. "drip").
    fn handle(&self) -> &str;

    /// Human-readable provider name.
    fn display_name(&self) -> &str;

    /// One-line description shown to administrators.
    fn description(&self) -> &str;

    /// OAuth endpoints of the provider.
    fn oauth_config(&self) -> OAuthConfig;

    /// OAuth client ID used with the provider.
    fn client_id(&self) -> &str;

    /// Discovers the lists and fields the remote account accepts.
    ///
    /// Returns empty settings if the remote service cannot be reached.
    async fn fetch_form_settings(&self) -> FormSettings;

    /// Pushes one submission to the remote service.
    ///
    /// Returns true only if the remote service confirmed the record.
    async fn send_payload(&self, submission: &Submission) -> bool;
}
