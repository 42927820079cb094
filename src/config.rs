//! Runtime settings loaded from the environment.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` calls [`Settings::from_env`] once at startup (after `dotenvy` has
//! loaded any `.env` file). The resulting value is shared read-only through
//! `AppState`; guards consult `require_account_verification`, the session
//! layer consults the cookie and TTL knobs, and the OAuth routes consult
//! `public_url` to build absolute callback URLs.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24;
/// Longest accepted session lifetime (one year).
const MAX_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 365;
const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Parse a boolean-ish environment variable.
///
/// Accepts `1/true/yes/on` and `0/false/no/off` (case-insensitive, trimmed).
/// Anything else, including an unset or blank variable, is `None`.
pub(crate) fn env_bool(key: &str) -> Option<bool> {
    const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];
    const FALSY: [&str; 4] = ["0", "false", "no", "off"];

    let value = env_nonempty(key)?;
    if TRUTHY.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSY.iter().any(|f| value.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_nonempty(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub database_url: Option<String>,
    /// Upper bound for the Postgres pool.
    pub db_max_connections: u32,
    /// Site-wide "require account verification" switch read by `ensure_account`.
    pub require_account_verification: bool,
    pub cookie_secure: bool,
    pub session_ttl: Duration,
    /// Absolute origin (no trailing slash) used to resolve OAuth callback paths.
    pub public_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            require_account_verification: false,
            cookie_secure: false,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            public_url: DEFAULT_PUBLIC_URL.to_owned(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT`, `DB_MAX_CONNECTIONS` or `SESSION_TTL_SECS` is
    /// set but malformed, or the TTL is zero or longer than a year.
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_url = env_nonempty("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_owned());

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT)?,
            database_url: env_nonempty("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            require_account_verification: env_bool("REQUIRE_ACCOUNT_VERIFICATION").unwrap_or(false),
            cookie_secure: cookie_secure(env_bool("COOKIE_SECURE"), &public_url),
            session_ttl: session_ttl(env_parse("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?)?,
            public_url,
        })
    }

    /// Resolve an app-relative path (e.g. `/login/github/callback/`) against `public_url`.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }
}

fn session_ttl(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 || secs > MAX_SESSION_TTL_SECS {
        return Err(ConfigError::Invalid { key: "SESSION_TTL_SECS", value: secs.to_string() });
    }
    Ok(Duration::from_secs(secs))
}

/// An explicit `COOKIE_SECURE` wins; otherwise infer from the public origin.
fn cookie_secure(explicit: Option<bool>, public_url: &str) -> bool {
    explicit.unwrap_or_else(|| public_url.starts_with("https://"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
