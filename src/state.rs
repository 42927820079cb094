//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and middleware via the `State`
//! extractor. Everything behind it is read-only after startup; the stores
//! and the page handler are trait objects so the binary can run against
//! Postgres or memory, and tests can swap in recording handlers.

use std::sync::Arc;

use crate::config::Settings;
use crate::handlers::PageHandler;
use crate::services::oauth::OAuthProviders;
use crate::services::session::SessionStore;
use crate::services::user::UserDirectory;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserDirectory>,
    pub pages: Arc<dyn PageHandler>,
    /// Enabled social sign-in providers.
    pub oauth: Arc<OAuthProviders>,
}

impl AppState {
    #[must_use]
    pub fn new(
        settings: Settings,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        pages: Arc<dyn PageHandler>,
        oauth: OAuthProviders,
    ) -> Self {
        Self { settings: Arc::new(settings), sessions, users, pages, oauth: Arc::new(oauth) }
    }
}

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
