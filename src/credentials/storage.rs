//! SQLite-backed token store.

use super::encryption::{self, Sealed};
use super::Token;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Encrypted token storage, one row per integration instance.
///
/// # Schema
/// ```sql
/// CREATE TABLE tokens (
///     integration TEXT PRIMARY KEY,
///     access_token TEXT NOT NULL,        -- sealed
///     access_token_nonce TEXT NOT NULL,
///     refresh_token TEXT,                -- sealed (optional)
///     refresh_token_nonce TEXT,
///     expires_at TEXT,                   -- RFC 3339 (optional)
///     updated_at TEXT NOT NULL
/// );
/// ```
pub struct TokenStore {
    conn: Mutex<Connection>,
    key: Vec<u8>,
}

impl TokenStore {
    /// Opens (or creates) the store at `db_path`.
    ///
    /// `encryption_key` is the base64-encoded 32-byte master key. Pass
    /// `":memory:"` as the path for a throwaway store.
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self> {
        let key = encryption::validate_key(encryption_key).context("Invalid encryption key")?;

        let conn = Connection::open(db_path).context("Failed to open token database")?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                integration TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                access_token_nonce TEXT NOT NULL,
                refresh_token TEXT,
                refresh_token_nonce TEXT,
                expires_at TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create tokens table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            key,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Token store connection lock poisoned"))
    }

    /// Stores the token for an integration, replacing any previous one.
    pub fn store(&self, integration: &str, token: &Token) -> Result<()> {
        let access = encryption::encrypt(&token.access_token, &self.key)
            .context("Failed to encrypt access token")?;
        let refresh = token
            .refresh_token
            .as_deref()
            .map(|t| encryption::encrypt(t, &self.key))
            .transpose()
            .context("Failed to encrypt refresh token")?;
        let (refresh_token, refresh_token_nonce) = match refresh {
            Some(sealed) => (Some(sealed.ciphertext), Some(sealed.nonce)),
            None => (None, None),
        };

        self.conn()?
            .execute(
                r#"
                INSERT INTO tokens (
                    integration,
                    access_token, access_token_nonce,
                    refresh_token, refresh_token_nonce,
                    expires_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(integration) DO UPDATE SET
                    access_token = excluded.access_token,
                    access_token_nonce = excluded.access_token_nonce,
                    refresh_token = excluded.refresh_token,
                    refresh_token_nonce = excluded.refresh_token_nonce,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at
                "#,
                params![
                    integration,
                    access.ciphertext,
                    access.nonce,
                    refresh_token,
                    refresh_token_nonce,
                    token.expires_at.map(|dt| dt.to_rfc3339()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to store token")?;

        Ok(())
    }

    /// Loads and decrypts the token for an integration, if one is stored.
    pub fn get(&self, integration: &str) -> Result<Option<Token>> {
        type Row = (String, String, Option<String>, Option<String>, Option<String>);

        let row: Option<Row> = self
            .conn()?
            .query_row(
                r#"
                SELECT access_token, access_token_nonce,
                       refresh_token, refresh_token_nonce,
                       expires_at
                FROM tokens
                WHERE integration = ?1
                "#,
                params![integration],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()
            .context("Failed to query token")?;

        let Some((access_token, access_nonce, refresh_token, refresh_nonce, expires_at)) = row
        else {
            return Ok(None);
        };

        let access_token = encryption::decrypt(
            &Sealed {
                ciphertext: access_token,
                nonce: access_nonce,
            },
            &self.key,
        )
        .context("Failed to decrypt access token")?;

        let refresh_token = match (refresh_token, refresh_nonce) {
            (Some(ciphertext), Some(nonce)) => Some(
                encryption::decrypt(&Sealed { ciphertext, nonce }, &self.key)
                    .context("Failed to decrypt refresh token")?,
            ),
            _ => None,
        };

        let expires_at = expires_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .context("Failed to parse expires_at timestamp")?;

        Ok(Some(Token {
            access_token,
            refresh_token,
            expires_at,
        }))
    }

    /// Removes the token for an integration. Returns false if there was none.
    pub fn delete(&self, integration: &str) -> Result<bool> {
        let rows = self
            .conn()?
            .execute(
                "DELETE FROM tokens WHERE integration = ?1",
                params![integration],
            )
            .context("Failed to delete token")?;
        Ok(rows > 0)
    }

    /// Lists the handles of all integrations that have a stored token.
    pub fn list(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT integration FROM tokens ORDER BY integration")
            .context("Failed to prepare query")?;

        let handles = stmt
            .query_map([], |row| row.get(0))
            .context("Failed to execute query")?
            .collect::<Result<Vec<String>, _>>()
            .context("Failed to read results")?;

        Ok(handles)
    }
}
