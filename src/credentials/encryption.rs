//! AES-256-GCM sealing of token strings.
//!
//! Access and refresh tokens are sealed independently, each under its own
//! random nonce. The master key is 32 bytes, supplied base64-encoded through
//! `FORMSYNC_ENCRYPTION_KEY`.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// Ciphertext and nonce of a sealed token, both base64-encoded for storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Sealed {
    pub ciphertext: String,
    pub nonce: String,
}

/// Decodes a base64 master key and checks that it is 32 bytes long.
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>> {
    let key = BASE64
        .decode(key_base64.trim())
        .context("Encryption key is not valid base64")?;

    if key.len() != KEY_SIZE {
        bail!(
            "Encryption key must be {} bytes (256 bits), got {} bytes",
            KEY_SIZE,
            key.len()
        );
    }

    Ok(key)
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_SIZE {
        bail!("Encryption key must be {} bytes", KEY_SIZE);
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Seals `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<Sealed> {
    let cipher = cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    Ok(Sealed {
        ciphertext: BASE64.encode(ciphertext),
        nonce: BASE64.encode(nonce),
    })
}

/// Opens a sealed token. Fails on a wrong key, wrong nonce or tampered data.
pub fn decrypt(sealed: &Sealed, key: &[u8]) -> Result<String> {
    let cipher = cipher(key)?;

    let ciphertext = BASE64
        .decode(&sealed.ciphertext)
        .context("Failed to decode ciphertext")?;
    let nonce = BASE64
        .decode(&sealed.nonce)
        .context("Failed to decode nonce")?;

    if nonce.len() != NONCE_SIZE {
        bail!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce.len()
        );
    }

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|e| anyhow!("Decryption failed (wrong key or corrupted data): {}", e))?;

    String::from_utf8(plaintext).context("Decrypted token is not valid UTF-8")
}
