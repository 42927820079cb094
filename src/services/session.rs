//! Server-side session storage.
//!
//! ARCHITECTURE
//! ============
//! The browser only ever holds an opaque random token in a cookie. Stores key
//! rows by the SHA-256 of that token, so a leaked `sessions` table cannot be
//! replayed as cookies. Session payloads are small JSON documents
//! ([`SessionData`]) that the request-scoped handle in
//! `middleware::session` reads and mutates.

use std::collections::HashMap;
use std::fmt::Write;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Random bytes behind each session token.
const TOKEN_BYTES: usize = 32;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut hex, b| {
        let _ = write!(hex, "{b:02x}");
        hex
    })
}

/// Mint a session token: [`TOKEN_BYTES`] random bytes, hex-encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    bytes_to_hex(&bytes)
}

/// Storage key for a session token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Everything persisted for one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Logged-in user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Where to send the user after a successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    /// CSRF `state` for an in-flight OAuth authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_state: Option<String>,
}

impl SessionData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.return_url.is_none() && self.oauth_state.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("session ttl {0:?} is out of range")]
    Ttl(Duration),
}

/// Persistence for session payloads, keyed by raw token.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live (unexpired) session.
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError>;
    /// Insert or overwrite a session, resetting its expiry to `now + ttl`.
    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<(), SessionError>;
    /// Remove a session. Removing an unknown token is not an error.
    async fn destroy(&self, token: &str) -> Result<(), SessionError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let row = sqlx::query("SELECT data FROM sessions WHERE token_hash = $1 AND expires_at > now()")
            .bind(hash_token(token))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<Json<SessionData>, _>("data").0))
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<(), SessionError> {
        sqlx::query(
            r"INSERT INTO sessions (token_hash, data, expires_at)
              VALUES ($1, $2, now() + make_interval(secs => $3))
              ON CONFLICT (token_hash) DO UPDATE SET data = EXCLUDED.data, expires_at = EXCLUDED.expires_at",
        )
        .bind(hash_token(token))
        .bind(Json(data))
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local store. Sessions vanish on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let key = hash_token(token);
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(data, _)| data.clone()))
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<(), SessionError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or(SessionError::Ttl(ttl))?;
        let mut sessions = self.sessions.write().await;
        // Sweep expired entries on write.
        sessions.retain(|_, (_, expiry)| *expiry > now);
        sessions.insert(hash_token(token), (data.clone(), expires_at));
        Ok(())
    }

    async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.write().await.remove(&hash_token(token));
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
