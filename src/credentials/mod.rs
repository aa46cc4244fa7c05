//! Encrypted token storage for integration instances.
//!
//! Every integration instance (keyed by its handle, e.g. `"drip"`) owns at most
//! one OAuth token. Tokens are encrypted at rest with AES-256-GCM and kept in
//! SQLite.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       TokenStore                         │
//! │  - upsert / get / delete per handle      │
//! │  - transparent encryption                │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)            (decrypt)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite (tokens table)              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use formsync::credentials::{Token, TokenStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let key = std::env::var("FORMSYNC_ENCRYPTION_KEY")?;
//! let store = TokenStore::new("tokens.db", &key)?;
//!
//! store.store("drip", &Token {
//!     access_token: "abc".to_string(),
//!     refresh_token: Some("def".to_string()),
//!     expires_at: None,
//! })?;
//!
//! if let Some(token) = store.get("drip")? {
//!     println!("expires at {:?}", token.expires_at);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

mod encryption;
mod storage;

pub use encryption::{decrypt, encrypt, validate_key};
pub use storage::TokenStore;

/// OAuth token for one integration instance.
///
/// The request core treats the access token as opaque; only the token
/// provider looks at `refresh_token` and `expires_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token sent with every API request
    pub access_token: String,

    /// Used to obtain a new access token
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC)
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// A token with an empty access token, used when nothing has been stored yet.
    pub fn empty() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Returns true if the token expires within `seconds` (or already has).
    ///
    /// Tokens without an expiry never report as expiring.
    pub fn expires_within(&self, seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + Duration::seconds(seconds),
            None => false,
        }
    }
}
