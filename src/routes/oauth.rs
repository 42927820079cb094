//! OAuth "authenticate" handler factory.
//!
//! `authenticate(provider, options)` builds the handler mounted on routes like
//! `GET /signup/github/`: it stashes a fresh CSRF `state` in the session and
//! redirects the browser to the provider's consent page. The matching
//! `/callback/` route is an ordinary page handler that calls
//! `Session::take_oauth_state` to check the round trip.

use std::future::{Ready, ready};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::found;
use crate::middleware::session::Session;
use crate::services::oauth::{AuthenticateOptions, Provider};
use crate::services::session::generate_token;
use crate::state::AppState;

/// Build the redirect-to-provider handler for one route.
pub fn authenticate(
    provider: Provider,
    options: AuthenticateOptions,
) -> impl Fn(State<AppState>, Session) -> Ready<Response> + Clone + Send + Sync + 'static {
    move |State(state): State<AppState>, session: Session| ready(begin(&state, &session, provider, &options))
}

fn begin(state: &AppState, session: &Session, provider: Provider, options: &AuthenticateOptions) -> Response {
    let oauth_state = generate_token();
    let redirect_uri = state.settings.absolute_url(&options.callback_path);

    match state
        .oauth
        .authorize_url(provider, &redirect_uri, options.scope, &oauth_state)
    {
        Ok(url) => {
            session.set_oauth_state(oauth_state);
            found(url.as_str())
        }
        Err(e) => {
            tracing::warn!(%provider, error = %e, "oauth authenticate unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
#[path = "oauth_test.rs"]
mod tests;
