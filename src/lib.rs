//! formsync - shared plumbing for forms-to-email-marketing integrations.
//!
//! Integration crates build on the pieces here:
//!
//! - [`credentials`] - encrypted per-integration OAuth token storage
//! - [`oauth`] - provider endpoints, authorize URLs and token refresh
//! - [`tokens`] - the [`tokens::TokenProvider`] integrations ask for bearer tokens
//! - [`integration`] - lists, fields, submissions and integration collaborators
//! - [`config`] - TOML configuration with environment overrides

// Service configuration
pub mod config;

// Encrypted token storage
pub mod credentials;

// Integration model and collaborator traits
pub mod integration;

// OAuth endpoints and refresh grant
pub mod oauth;

// Token provider
pub mod tokens;
