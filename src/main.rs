use std::sync::Arc;

use drywall::config::Settings;
use drywall::services::oauth::OAuthProviders;
use drywall::services::session::{MemorySessionStore, PgSessionStore, SessionStore};
use drywall::services::user::{MemoryUserDirectory, PgUserDirectory, UserDirectory};
use drywall::{AppState, Unwired, db};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env().expect("invalid configuration");
    let port = settings.port;

    let (sessions, users): (Arc<dyn SessionStore>, Arc<dyn UserDirectory>) =
        match db::connect(&settings).await.expect("database init failed") {
            Some(pool) => (Arc::new(PgSessionStore::new(pool.clone())), Arc::new(PgUserDirectory::new(pool))),
            None => {
                tracing::warn!("DATABASE_URL not set; sessions are in-memory and the user directory is empty");
                (Arc::new(MemorySessionStore::new()), Arc::new(MemoryUserDirectory::new()))
            }
        };

    let oauth = OAuthProviders::from_env();
    tracing::info!(providers = ?oauth.enabled(), "social sign-in");

    // Standalone runs have no page handlers; embedders pass their own to `drywall::app`.
    let state = AppState::new(settings, sessions, users, Arc::new(Unwired), oauth);

    let app = drywall::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "drywall listening");
    axum::serve(listener, app).await.expect("server failed");
}
