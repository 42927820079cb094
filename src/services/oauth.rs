//! Social sign-in providers and authorization-URL construction.
//!
//! Only the first leg of each flow lives here: sending the browser to the
//! provider's consent page with a CSRF `state`. Code exchange and profile
//! handling belong to the callback handlers.

use std::collections::HashMap;
use std::fmt;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Twitter,
    GitHub,
    Facebook,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Provider::Twitter, Provider::GitHub, Provider::Facebook, Provider::Google];

    /// URL segment and env-var stem, e.g. `github`.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::GitHub => "github",
            Self::Facebook => "facebook",
            Self::Google => "google",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Twitter => "Twitter",
            Self::GitHub => "GitHub",
            Self::Facebook => "Facebook",
            Self::Google => "Google",
        }
    }

    #[must_use]
    pub fn authorize_endpoint(self) -> &'static str {
        match self {
            Self::Twitter => "https://twitter.com/i/oauth2/authorize",
            Self::GitHub => "https://github.com/login/oauth/authorize",
            Self::Facebook => "https://www.facebook.com/dialog/oauth",
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Per-route parameters handed to the authenticate factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateOptions {
    /// App-relative callback path, e.g. `/signup/github/callback/`.
    pub callback_path: String,
    pub scope: &'static [&'static str],
}

/// Client credentials for one provider.
///
/// Only `client_id` goes into the authorize URL; `client_secret` is for the
/// callback handlers' code exchange, reached through [`OAuthProviders::config`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderConfig {
    /// Load from `{SLUG}_OAUTH_KEY` / `{SLUG}_OAUTH_SECRET`.
    /// Returns `None` if either is missing (the provider is disabled).
    #[must_use]
    pub fn from_env(provider: Provider) -> Option<Self> {
        let stem = provider.slug().to_ascii_uppercase();
        let client_id = std::env::var(format!("{stem}_OAUTH_KEY"))
            .ok()
            .filter(|v| !v.is_empty())?;
        let client_secret = std::env::var(format!("{stem}_OAUTH_SECRET"))
            .ok()
            .filter(|v| !v.is_empty())?;
        Some(Self { client_id, client_secret })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("{} sign-in is not configured", .0.display_name())]
    NotConfigured(Provider),
    #[error("invalid authorize url: {0}")]
    Url(#[from] url::ParseError),
}

/// The set of enabled providers.
#[derive(Debug, Clone, Default)]
pub struct OAuthProviders {
    configs: HashMap<Provider, ProviderConfig>,
}

impl OAuthProviders {
    #[must_use]
    pub fn from_env() -> Self {
        let configs = Provider::ALL
            .into_iter()
            .filter_map(|p| ProviderConfig::from_env(p).map(|c| (p, c)))
            .collect();
        Self { configs }
    }

    #[must_use]
    pub fn with(mut self, provider: Provider, config: ProviderConfig) -> Self {
        self.configs.insert(provider, config);
        self
    }

    /// Credentials for `provider`, if it is enabled.
    #[must_use]
    pub fn config(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.configs.get(&provider)
    }

    #[must_use]
    pub fn enabled(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.configs.contains_key(p))
            .collect()
    }

    /// Build the provider consent URL.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::NotConfigured`] when the provider has no credentials.
    pub fn authorize_url(&self, provider: Provider, redirect_uri: &str, scope: &[&str], state: &str) -> Result<Url, OAuthError> {
        let config = self
            .config(provider)
            .ok_or(OAuthError::NotConfigured(provider))?;

        let mut url = Url::parse(provider.authorize_endpoint())?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &config.client_id)
                .append_pair("redirect_uri", redirect_uri);
            if !scope.is_empty() {
                query.append_pair("scope", &scope.join(" "));
            }
            query.append_pair("state", state);
        }
        Ok(url)
    }
}

#[cfg(test)]
#[path = "oauth_test.rs"]
mod tests;
