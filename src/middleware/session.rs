//! Request-scoped session handle and the layer that loads/commits it.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`session_layer`] wraps the whole router. For every request it:
//! 1. reads the `drywall.sid` cookie and loads the session from the store
//!    (or starts a fresh, unsaved one);
//! 2. resolves the logged-in user through the `UserDirectory`;
//! 3. inserts a [`Session`] handle and a [`CurrentUser`] into request
//!    extensions for guards and handlers;
//! 4. after the inner service responds, persists the session if anything
//!    changed and (re)issues or clears the cookie.
//!
//! Empty sessions are never written, so anonymous browsing leaves no rows.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::services::session::{SessionData, generate_token};
use crate::services::user::User;
use crate::state::AppState;

pub const COOKIE_NAME: &str = "drywall.sid";

struct Inner {
    token: String,
    data: SessionData,
    /// Token was minted for this request and has no stored row yet.
    fresh: bool,
    modified: bool,
    /// Tokens to delete from the store on commit (after `regenerate`).
    retired: Vec<String>,
}

/// Shared, mutable view of the current request's session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    fn build(token: String, data: SessionData, fresh: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { token, data, fresh, modified: false, retired: Vec::new() })),
        }
    }

    /// Start an unsaved session with a new token.
    #[must_use]
    pub fn fresh() -> Self {
        Self::build(generate_token(), SessionData::default(), true)
    }

    /// Wrap a session loaded from the store.
    #[must_use]
    pub fn existing(token: String, data: SessionData) -> Self {
        Self::build(token, data, false)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut SessionData)) {
        let mut inner = self.lock();
        f(&mut inner.data);
        inner.modified = true;
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.lock().data.user_id
    }

    #[must_use]
    pub fn return_url(&self) -> Option<String> {
        self.lock().data.return_url.clone()
    }

    pub fn set_return_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.update(|data| data.return_url = Some(url));
    }

    /// Remove and return the post-login destination.
    pub fn take_return_url(&self) -> Option<String> {
        let mut inner = self.lock();
        let url = inner.data.return_url.take();
        if url.is_some() {
            inner.modified = true;
        }
        url
    }

    pub fn set_oauth_state(&self, state: impl Into<String>) {
        let state = state.into();
        self.update(|data| data.oauth_state = Some(state));
    }

    /// Remove and return the pending OAuth `state`; single use.
    pub fn take_oauth_state(&self) -> Option<String> {
        let mut inner = self.lock();
        let state = inner.data.oauth_state.take();
        if state.is_some() {
            inner.modified = true;
        }
        state
    }

    /// Swap to a new token, keeping the payload. The old row is deleted on commit.
    pub fn regenerate(&self) {
        let mut inner = self.lock();
        let old = std::mem::replace(&mut inner.token, generate_token());
        if !inner.fresh {
            inner.retired.push(old);
        }
        inner.fresh = true;
        inner.modified = true;
    }

    /// Bind the session to a user. Rotates the token to prevent fixation.
    pub fn log_in(&self, user_id: Uuid) {
        self.regenerate();
        self.update(|data| data.user_id = Some(user_id));
    }

    pub fn log_out(&self) {
        self.update(|data| data.user_id = None);
    }

    #[cfg(test)]
    pub(crate) fn token(&self) -> String {
        self.lock().token.clone()
    }

    fn commit_plan(&self) -> CommitPlan {
        let inner = self.lock();
        CommitPlan {
            token: inner.token.clone(),
            data: inner.data.clone(),
            fresh: inner.fresh,
            modified: inner.modified,
            retired: inner.retired.clone(),
        }
    }
}

/// What the layer must do with the store and cookie once the handler is done.
#[derive(Debug)]
struct CommitPlan {
    token: String,
    data: SessionData,
    fresh: bool,
    modified: bool,
    retired: Vec<String>,
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// The user bound to the session, if the session is authenticated.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.cookie_secure)
        .max_age(time::Duration::seconds(
            i64::try_from(state.settings.session_ttl.as_secs()).unwrap_or(i64::MAX),
        ))
        .build()
}

fn clear_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Load the session from the store, falling back to a fresh one on any miss.
async fn load_session(state: &AppState, jar: &CookieJar) -> Session {
    let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) else {
        return Session::fresh();
    };

    match state.sessions.load(token).await {
        Ok(Some(data)) => Session::existing(token.to_owned(), data),
        Ok(None) => Session::fresh(),
        Err(e) => {
            tracing::error!(error = %e, "session load failed; continuing anonymously");
            Session::fresh()
        }
    }
}

/// Resolve the session's user. Unknown or deactivated users count as logged out.
async fn resolve_user(state: &AppState, session: &Session) -> Option<User> {
    let user_id = session.user_id()?;
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) if user.is_active => Some(user),
        Ok(_) => {
            tracing::debug!(%user_id, "session user missing or inactive");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, %user_id, "user lookup failed");
            None
        }
    }
}

/// Persist session changes and return the cookie jar to send back.
async fn commit(state: &AppState, session: &Session, jar: CookieJar) -> CookieJar {
    let plan = session.commit_plan();

    for old in &plan.retired {
        if let Err(e) = state.sessions.destroy(old).await {
            tracing::warn!(error = %e, "failed to delete rotated session");
        }
    }

    if !plan.modified {
        return jar;
    }

    if plan.data.is_empty() {
        if plan.fresh {
            return jar;
        }
        if let Err(e) = state.sessions.destroy(&plan.token).await {
            tracing::warn!(error = %e, "failed to delete emptied session");
        }
        return jar.add(clear_cookie());
    }

    match state
        .sessions
        .save(&plan.token, &plan.data, state.settings.session_ttl)
        .await
    {
        Ok(()) if plan.fresh => jar.add(session_cookie(state, plan.token)),
        Ok(()) => jar,
        Err(e) => {
            tracing::error!(error = %e, "session save failed");
            jar
        }
    }
}

/// Middleware: attach [`Session`] and [`CurrentUser`] to every request.
pub async fn session_layer(State(state): State<AppState>, jar: CookieJar, mut req: Request, next: Next) -> Response {
    let session = load_session(&state, &jar).await;
    let user = resolve_user(&state, &session).await;

    req.extensions_mut().insert(session.clone());
    req.extensions_mut().insert(CurrentUser(user));

    let response = next.run(req).await;
    let jar = commit(&state, &session, jar).await;
    (jar, response).into_response()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
