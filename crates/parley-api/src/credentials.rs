use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use parley_types::api::Claims;

use crate::error::ApiError;

pub const TOKEN_TTL_DAYS: i64 = 30;

/// Issues and verifies HS256 session tokens with a single shared secret.
#[derive(Clone)]
pub struct Credentials {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl Credentials {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::days(TOKEN_TTL_DAYS))
    }

    pub fn with_ttl(secret: &str, token_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        }
    }

    pub fn issue_token(&self, user_id: i64, email: &str) -> anyhow::Result<String> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            exp: (Utc::now() + self.token_ttl).timestamp().max(0) as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Expiry is enforced to the second: no leeway past `exp`.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected session token: {}", e);
                ApiError::Unauthorized
            })
    }
}

// -- Password verifiers --
//
// Stored verifiers are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`),
// so the algorithm and its parameters travel with each row. Rows written by the
// previous scheme hold a bare SHA-256 hex digest; those still verify and are
// reported by `needs_rehash` so login can replace them.

/// Hashes a password into a new Argon2id verifier.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, verifier: &str) -> bool {
    if is_legacy_verifier(verifier) {
        return legacy_digest(password).eq_ignore_ascii_case(verifier);
    }

    match PasswordHash::new(verifier) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unreadable password verifier: {}", e);
            false
        }
    }
}

/// True when the verifier uses a scheme that should be replaced on next login.
pub fn needs_rehash(verifier: &str) -> bool {
    is_legacy_verifier(verifier)
}

fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_legacy_verifier(verifier: &str) -> bool {
    verifier.len() == 64 && verifier.bytes().all(|b| b.is_ascii_hexdigit())
}
