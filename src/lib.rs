//! # drywall
//!
//! Routing and access control for a user-management web site: the full
//! route table, the `/admin*` and `/account*` guard chains, cookie sessions,
//! and the first leg of social sign-in.
//!
//! ## Embedding
//!
//! Pages are supplied by the embedding application. Implement
//! [`PageHandler`], pick a [`SessionStore`](services::session::SessionStore)
//! and a [`UserDirectory`](services::user::UserDirectory), and serve
//! [`app`]:
//!
//! ```no_run
//! # async fn run(pages: std::sync::Arc<dyn drywall::PageHandler>) {
//! use std::sync::Arc;
//! use drywall::services::{oauth::OAuthProviders, session::MemorySessionStore, user::MemoryUserDirectory};
//!
//! let state = drywall::AppState::new(
//!     drywall::config::Settings::default(),
//!     Arc::new(MemorySessionStore::new()),
//!     Arc::new(MemoryUserDirectory::new()),
//!     pages,
//!     OAuthProviders::from_env(),
//! );
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, drywall::app(state)).await.unwrap();
//! # }
//! ```
//!
//! Handlers see the request through [`HandlerRequest`]; login handlers call
//! [`Session::log_in`] and redirect to [`Session::take_return_url`].

pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use handlers::{Action, HandlerRequest, Module, PageHandler, Unwired};
pub use middleware::session::{CurrentUser, Session};
pub use routes::app;
pub use services::oauth::{OAuthProviders, Provider, ProviderConfig};
pub use services::session::{MemorySessionStore, PgSessionStore, SessionStore};
pub use services::user::{MemoryUserDirectory, PgUserDirectory, User, UserDirectory};
pub use state::AppState;
