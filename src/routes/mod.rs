//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module is the route table: every (verb, path) the site answers, the
//! handler each one names, and the middleware stack around them. Request flow:
//!
//! ```text
//! trace -> compression -> normalize_path -> session_layer -> route_guards -> route | 404
//! ```
//!
//! `normalize_path` sits outside routing and maps `/Admin/Users` onto the
//! registered `/admin/users/`, so matching ignores case and an optional
//! trailing slash. `route_guards` applies the `/admin*` and `/account*`
//! chains by path prefix on every route and on the 404 fallback, so
//! unmatched paths are guarded too. A path that exists but lacks the verb
//! gets the same 404 handler.

pub mod oauth;
pub mod paths;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get, post, put};
use futures::future::BoxFuture;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, Action, HandlerRequest, Module};
use crate::middleware::{guards, session};
use crate::services::oauth::{AuthenticateOptions, Provider};
use crate::state::AppState;
use paths::PathTable;

/// `302 Found` to `location`, sent verbatim (an empty location included).
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

/// Handler that forwards to the application's [`handlers::PageHandler`].
pub fn page(
    module: Module,
    method: &'static str,
) -> impl Fn(State<AppState>, HandlerRequest) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    let action = Action::new(module, method);
    move |State(state): State<AppState>, request: HandlerRequest| {
        Box::pin(async move {
            tracing::debug!(%action, path = %request.uri.path(), "dispatch");
            state.pages.handle(action, request).await
        })
    }
}

/// Router under construction plus the patterns it answers.
#[derive(Default)]
struct Table {
    router: Router<AppState>,
    paths: PathTable,
}

impl Table {
    fn route(mut self, path: &str, method_router: MethodRouter<AppState>) -> Self {
        self.paths.insert(path);
        self.router = self.router.route(path, method_router);
        self
    }
}

/// Where a social route sits; decides its paths, scopes and callback handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocialFlow {
    Signup,
    Login,
    Settings,
}

impl SocialFlow {
    fn base(self) -> &'static str {
        match self {
            Self::Signup => "/signup",
            Self::Login => "/login",
            Self::Settings => "/account/settings",
        }
    }

    /// Scopes requested at the consent screen.
    fn scope(self, provider: Provider) -> &'static [&'static str] {
        match (self, provider) {
            (Self::Signup, Provider::GitHub) => &["user:email"],
            (Self::Signup, Provider::Facebook) => &["email"],
            (_, Provider::Google) => &["profile email"],
            _ => &[],
        }
    }

    fn callback(self, provider: Provider) -> Action {
        let (module, method) = match (self, provider) {
            (Self::Signup, Provider::Twitter) => (Module::Signup, "signupTwitter"),
            (Self::Signup, Provider::GitHub) => (Module::Signup, "signupGitHub"),
            (Self::Signup, Provider::Facebook) => (Module::Signup, "signupFacebook"),
            (Self::Signup, Provider::Google) => (Module::Signup, "signupGoogle"),
            (Self::Login, Provider::Twitter) => (Module::Login, "loginTwitter"),
            (Self::Login, Provider::GitHub) => (Module::Login, "loginGitHub"),
            (Self::Login, Provider::Facebook) => (Module::Login, "loginFacebook"),
            (Self::Login, Provider::Google) => (Module::Login, "loginGoogle"),
            (Self::Settings, Provider::Twitter) => (Module::AccountSettings, "connectTwitter"),
            (Self::Settings, Provider::GitHub) => (Module::AccountSettings, "connectGitHub"),
            (Self::Settings, Provider::Facebook) => (Module::AccountSettings, "connectFacebook"),
            (Self::Settings, Provider::Google) => (Module::AccountSettings, "connectGoogle"),
        };
        Action::new(module, method)
    }

    fn disconnect(provider: Provider) -> Action {
        let method = match provider {
            Provider::Twitter => "disconnectTwitter",
            Provider::GitHub => "disconnectGitHub",
            Provider::Facebook => "disconnectFacebook",
            Provider::Google => "disconnectGoogle",
        };
        Action::new(Module::AccountSettings, method)
    }
}

/// `GET {base}/{provider}/` and `GET {base}/{provider}/callback/` for every provider,
/// plus `.../disconnect/` under account settings.
fn social_routes(mut table: Table, flow: SocialFlow) -> Table {
    for provider in Provider::ALL {
        let start = format!("{}/{}/", flow.base(), provider.slug());
        let callback_path = format!("{start}callback/");
        let callback = flow.callback(provider);

        table = table
            .route(
                &start,
                get(oauth::authenticate(
                    provider,
                    AuthenticateOptions { callback_path: callback_path.clone(), scope: flow.scope(provider) },
                )),
            )
            .route(&callback_path, get(page(callback.module, callback.method)));

        if flow == SocialFlow::Settings {
            let disconnect = SocialFlow::disconnect(provider);
            table = table.route(&format!("{start}disconnect/"), get(page(disconnect.module, disconnect.method)));
        }
    }
    table
}

fn front_routes(table: Table) -> Table {
    table
        .route("/", get(page(Module::Views, "init")))
        .route("/about/", get(page(Module::About, "init")))
        .route(
            "/contact/",
            get(page(Module::Contact, "init")).post(page(Module::Contact, "sendMessage")),
        )
}

fn signup_routes(table: Table) -> Table {
    let table = table
        .route(
            "/signup/",
            get(page(Module::Signup, "init")).post(page(Module::Signup, "signup")),
        )
        .route("/signup/social/", post(page(Module::Signup, "signupSocial")));
    social_routes(table, SocialFlow::Signup)
}

fn login_routes(table: Table) -> Table {
    let table = table
        .route(
            "/login/",
            get(page(Module::Login, "init")).post(page(Module::Login, "login")),
        )
        .route(
            "/login/forgot/",
            get(page(Module::LoginForgot, "init")).post(page(Module::LoginForgot, "send")),
        )
        .route("/login/reset/", get(page(Module::LoginReset, "init")))
        .route(
            "/login/reset/{email}/{token}/",
            get(page(Module::LoginReset, "init")).put(page(Module::LoginReset, "set")),
        )
        .route("/logout/", get(handlers::logout));
    social_routes(table, SocialFlow::Login)
}

/// Collection + member CRUD shared by several admin sections.
fn crud(table: Table, base: &str, module: Module) -> Table {
    table
        .route(
            &format!("{base}/"),
            get(page(module, "find")).post(page(module, "create")),
        )
        .route(
            &format!("{base}/{{id}}/"),
            get(page(module, "read"))
                .put(page(module, "update"))
                .delete(page(module, "delete")),
        )
}

fn admin_routes(table: Table) -> Table {
    let mut table = table.route("/admin/", get(page(Module::Admin, "init")));

    // users
    table = crud(table, "/admin/users", Module::AdminUsers)
        .route("/admin/users/{id}/password/", put(page(Module::AdminUsers, "password")))
        .route(
            "/admin/users/{id}/role-admin/",
            put(page(Module::AdminUsers, "linkAdmin")).delete(page(Module::AdminUsers, "unlinkAdmin")),
        )
        .route(
            "/admin/users/{id}/role-account/",
            put(page(Module::AdminUsers, "linkAccount")).delete(page(Module::AdminUsers, "unlinkAccount")),
        );

    // administrators
    table = crud(table, "/admin/administrators", Module::AdminAdministrators)
        .route(
            "/admin/administrators/{id}/permissions/",
            put(page(Module::AdminAdministrators, "permissions")),
        )
        .route(
            "/admin/administrators/{id}/groups/",
            put(page(Module::AdminAdministrators, "groups")),
        )
        .route(
            "/admin/administrators/{id}/user/",
            put(page(Module::AdminAdministrators, "linkUser")).delete(page(Module::AdminAdministrators, "unlinkUser")),
        );

    // admin groups
    table = crud(table, "/admin/admin-groups", Module::AdminAdminGroups).route(
        "/admin/admin-groups/{id}/permissions/",
        put(page(Module::AdminAdminGroups, "permissions")),
    );

    // accounts
    table = crud(table, "/admin/accounts", Module::AdminAccounts)
        .route(
            "/admin/accounts/{id}/user/",
            put(page(Module::AdminAccounts, "linkUser")).delete(page(Module::AdminAccounts, "unlinkUser")),
        )
        .route("/admin/accounts/{id}/notes/", post(page(Module::AdminAccounts, "newNote")))
        .route("/admin/accounts/{id}/status/", post(page(Module::AdminAccounts, "newStatus")));

    table = crud(table, "/admin/statuses", Module::AdminStatuses);
    table = crud(table, "/admin/categories", Module::AdminCategories);

    table.route("/admin/search/", get(page(Module::AdminSearch, "find")))
}

fn account_routes(table: Table) -> Table {
    let table = table
        .route("/account/", get(page(Module::Account, "init")))
        .route(
            "/account/verification/",
            get(page(Module::AccountVerification, "init")).post(page(Module::AccountVerification, "resendVerification")),
        )
        .route(
            "/account/verification/{token}/",
            get(page(Module::AccountVerification, "verify")),
        )
        .route(
            "/account/settings/",
            get(page(Module::AccountSettings, "init")).put(page(Module::AccountSettings, "update")),
        )
        .route(
            "/account/settings/identity/",
            put(page(Module::AccountSettings, "identity")),
        )
        .route(
            "/account/settings/password/",
            put(page(Module::AccountSettings, "password")),
        );
    social_routes(table, SocialFlow::Settings)
}

/// Every route the site answers, and the patterns for path normalization.
fn table() -> Table {
    let table = front_routes(Table::default());
    let table = signup_routes(table);
    let table = login_routes(table);
    let table = admin_routes(table);
    account_routes(table)
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let Table { router, paths: patterns } = table();

    let routed = router
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), guards::route_guards))
        .layer(middleware::from_fn_with_state(state.clone(), session::session_layer))
        .with_state(state);

    // The outer router has no routes, so its layers run before `routed` matches.
    Router::new()
        .fallback_service(routed)
        .layer(middleware::from_fn_with_state(Arc::new(patterns), paths::normalize_path))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
