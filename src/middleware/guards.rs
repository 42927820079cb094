//! Authentication and authorization guards for `/admin*` and `/account*`.
//!
//! DESIGN
//! ======
//! Each guard is a pure decision over the session user returning a
//! [`Verdict`]; [`route_guards`] is the single middleware that picks the guard
//! chain for the request path and turns a [`Denial`] into a redirect.
//! Guards never produce error statuses: every denial is a 302.
//!
//! Prefix matching is textual and ignores case (`/admin*` also covers
//! `/administrators` and `/ADMIN/`). The layer wraps the fallback as well, so
//! unmatched sub-paths are guarded before they reach the 404 handler.

use axum::extract::{OriginalUri, Request, State};
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::session::{CurrentUser, Session};
use crate::routes::found;
use crate::services::user::{Role, User};
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login/";
pub const VERIFICATION_PATH: &str = "/account/verification/";
/// Where non-admins are sent from `/admin*`. Empty, matching the deployed behavior.
pub const ADMIN_DENIED_REDIRECT: &str = "";
pub const ACCOUNT_DENIED_REDIRECT: &str = "/";

pub static X_AUTH_REQUIRED: HeaderName = HeaderName::from_static("x-auth-required");

/// Why a guard stopped the request. Every denial is a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Not logged in: flag the response and send to the login page.
    LoginRequired,
    Redirect(&'static str),
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        match self {
            Denial::LoginRequired => ([(X_AUTH_REQUIRED.clone(), "true")], found(LOGIN_PATH)).into_response(),
            Denial::Redirect(location) => found(location),
        }
    }
}

/// Result of a guard: `Ok` hands the request on.
pub type Verdict = Result<(), Denial>;

/// Guarded URL areas and their guard chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// `/admin*`: authenticated, then admin.
    Admin,
    /// `/account*`: authenticated, then account (with verification).
    Account,
}

fn starts_with_ignore_case(path: &str, prefix: &str) -> bool {
    path.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

impl Area {
    /// Area for a raw request path. Case-insensitive, like the router.
    #[must_use]
    pub fn for_path(path: &str) -> Option<Self> {
        if starts_with_ignore_case(path, "/admin") {
            Some(Self::Admin)
        } else if starts_with_ignore_case(path, "/account") {
            Some(Self::Account)
        } else {
            None
        }
    }
}

/// Let authenticated sessions through; otherwise remember where they were going.
///
/// # Errors
///
/// [`Denial::LoginRequired`] when nobody is logged in.
pub fn ensure_authenticated<'a>(user: &'a CurrentUser, session: &Session, original_url: &str) -> Result<&'a User, Denial> {
    user.0.as_ref().ok_or_else(|| {
        session.set_return_url(original_url);
        Denial::LoginRequired
    })
}

/// # Errors
///
/// Redirects to [`ADMIN_DENIED_REDIRECT`] without the admin role.
pub fn ensure_admin(user: &User) -> Verdict {
    if user.can_play_role_of(Role::Admin) {
        Ok(())
    } else {
        Err(Denial::Redirect(ADMIN_DENIED_REDIRECT))
    }
}

/// Account holders pass, unless verification is required and still pending.
/// The verification pages themselves stay reachable so the user can verify;
/// that check is on the raw path and case-sensitive.
///
/// # Errors
///
/// Redirects home without the account role, or to the verification page.
pub fn ensure_account(user: &User, require_verification: bool, path: &str) -> Verdict {
    if !user.can_play_role_of(Role::Account) {
        return Err(Denial::Redirect(ACCOUNT_DENIED_REDIRECT));
    }
    if require_verification && !user.is_verified() && !path.starts_with(VERIFICATION_PATH) {
        return Err(Denial::Redirect(VERIFICATION_PATH));
    }
    Ok(())
}

/// Run the guard chain for `area`, stopping at the first denial.
///
/// # Errors
///
/// The first [`Denial`] in the chain.
pub fn evaluate(
    area: Area,
    user: &CurrentUser,
    session: &Session,
    original_url: &str,
    path: &str,
    require_verification: bool,
) -> Verdict {
    let user = ensure_authenticated(user, session, original_url)?;
    match area {
        Area::Admin => ensure_admin(user),
        Area::Account => ensure_account(user, require_verification, path),
    }
}

/// Middleware applied to the whole router; a no-op outside guarded areas.
///
/// Decisions use the URL as the client sent it, before path normalization.
pub async fn route_guards(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let original = req
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| req.uri().clone(), |uri| uri.0.clone());
    let path = original.path().to_owned();
    let Some(area) = Area::for_path(&path) else {
        return next.run(req).await;
    };
    let original_url = original
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_owned());

    let user = req.extensions().get::<CurrentUser>().cloned().unwrap_or_default();
    let session = req.extensions().get::<Session>().cloned().unwrap_or_else(|| {
        tracing::warn!("guard ran without a session layer");
        Session::fresh()
    });

    match evaluate(
        area,
        &user,
        &session,
        &original_url,
        &path,
        state.settings.require_account_verification,
    ) {
        Ok(()) => next.run(req).await,
        Err(denial) => {
            tracing::debug!(?area, ?denial, %path, "guard denied request");
            denial.into_response()
        }
    }
}

#[cfg(test)]
#[path = "guards_test.rs"]
mod tests;
