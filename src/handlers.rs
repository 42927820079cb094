//! Page handler seam.
//!
//! ARCHITECTURE
//! ============
//! The route table names a handler for every binding ([`Action`]), but the
//! pages themselves (signup forms, admin CRUD, account settings, OAuth
//! callbacks) are supplied by the embedding application through
//! [`PageHandler`]. This crate owns only the two handlers that are pure
//! session/HTTP plumbing: [`not_found`] and [`logout`].

use std::collections::HashMap;
use std::fmt;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, RawPathParams, Request};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Json, Response};

use crate::middleware::session::{CurrentUser, Session};
use crate::routes::found;
use crate::services::user::User;

/// Upper bound on buffered form/JSON bodies.
const BODY_LIMIT: usize = 1024 * 1024;

/// Handler module a route points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Views,
    About,
    Contact,
    Signup,
    Login,
    LoginForgot,
    LoginReset,
    Admin,
    AdminUsers,
    AdminAdministrators,
    AdminAdminGroups,
    AdminAccounts,
    AdminStatuses,
    AdminCategories,
    AdminSearch,
    Account,
    AccountVerification,
    AccountSettings,
}

impl Module {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::About => "about",
            Self::Contact => "contact",
            Self::Signup => "signup",
            Self::Login => "login",
            Self::LoginForgot => "loginForgot",
            Self::LoginReset => "loginReset",
            Self::Admin => "admin",
            Self::AdminUsers => "adminUsers",
            Self::AdminAdministrators => "adminAdministrators",
            Self::AdminAdminGroups => "adminAdminGroups",
            Self::AdminAccounts => "adminAccounts",
            Self::AdminStatuses => "adminStatuses",
            Self::AdminCategories => "adminCategories",
            Self::AdminSearch => "adminSearch",
            Self::Account => "account",
            Self::AccountVerification => "accountVerification",
            Self::AccountSettings => "accountSettings",
        }
    }
}

/// A named handler method, e.g. `adminUsers.find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub module: Module,
    pub method: &'static str,
}

impl Action {
    #[must_use]
    pub const fn new(module: Module, method: &'static str) -> Self {
        Self { module, method }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module.name(), self.method)
    }
}

/// Everything a page handler gets from the request.
pub struct HandlerRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path captures, e.g. `id`, or `email` and `token`.
    pub params: HashMap<String, String>,
    pub session: Session,
    /// Present when the session is authenticated.
    pub user: Option<User>,
    pub body: Bytes,
}

impl HandlerRequest {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl<S> FromRequest<S> for HandlerRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        // Routes without captures simply yield no params.
        let params = RawPathParams::from_request_parts(&mut parts, state)
            .await
            .map(|raw| {
                raw.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect()
            })
            .unwrap_or_default();
        let session = Session::from_request_parts(&mut parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let CurrentUser(user) = parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default();
        let body = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE.into_response())?;

        Ok(Self { method: parts.method, uri: parts.uri, headers: parts.headers, params, session, user, body })
    }
}

/// Implemented by the application to render pages and perform actions.
#[async_trait::async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(&self, action: Action, request: HandlerRequest) -> Response;
}

/// Default handler set: every page answers `501` naming its action.
pub struct Unwired;

#[async_trait::async_trait]
impl PageHandler for Unwired {
    async fn handle(&self, action: Action, _request: HandlerRequest) -> Response {
        (StatusCode::NOT_IMPLEMENTED, format!("{action} is not wired to a page handler")).into_response()
    }
}

fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Catch-all for unmatched paths and verbs.
pub async fn not_found(method: Method, uri: Uri, headers: HeaderMap) -> Response {
    tracing::debug!(%method, %uri, "no route");
    if is_xhr(&headers) {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Resource not found." }))).into_response();
    }
    (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1><p>The page you requested doesn't exist.</p>")).into_response()
}

/// `GET /logout/`: drop the login from the session and go home.
pub async fn logout(session: Session) -> Response {
    session.log_out();
    found("/")
}

#[cfg(test)]
#[path = "handlers_test.rs"]
mod tests;
