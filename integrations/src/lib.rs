//! formsync integrations - email-marketing providers behind one interface.
//!
//! Form submissions are pushed to remote marketing services (Drip, ...)
//! through the [`Integration`] trait. Each configured instance owns an
//! authenticated API client that heals itself when the stored OAuth token
//! has expired.
//!
//! # Architecture
//!
//! ```text
//!   Form submission            Form builder
//!          ↓                        ↓
//! ┌─────────────────────────────────────────┐
//! │       HTTP API (axum)                    │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Integration (implements trait)     │
//! │  - Discover lists and fields             │
//! │  - Map and send submissions              │
//! └─────────────────────────────────────────┘
//!          ↓
//!   Remote marketing API (OAuth bearer)
//! ```
//!
//! # Core Types
//!
//! - [`Integration`] - Trait that all providers implement
//! - [`registry::build_integrations`] - Instances from configuration
//! - [`api::create_router`] - HTTP surface over the instances
//!
//! # Adding a Provider
//!
//! ```no_run
//! use formsync_integrations::Integration;
//! use formsync::integration::{FormSettings, Submission};
//! use formsync::oauth::OAuthConfig;
//! use async_trait::async_trait;
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl Integration for MyProvider {
//!     fn handle(&self) -> &str { "myprovider" }
//!     fn display_name(&self) -> &str { "My Provider" }
//!     fn description(&self) -> &str { "Adds subscribers to My Provider." }
//!     fn client_id(&self) -> &str { "client-id" }
//!
//!     fn oauth_config(&self) -> OAuthConfig {
//!         OAuthConfig {
//!             auth_url: "https://example.com/oauth/authorize".to_string(),
//!             token_url: "https://example.com/oauth/token".to_string(),
//!             scopes: vec![],
//!         }
//!     }
//!
//!     async fn fetch_form_settings(&self) -> FormSettings {
//!         FormSettings::default()
//!     }
//!
//!     async fn send_payload(&self, _submission: &Submission) -> bool {
//!         false
//!     }
//! }
//! ```

mod integration;
pub mod api;
pub mod connectors;
pub mod registry;

pub use connectors::drip::DripIntegration;
pub use integration::Integration;
