//! # kudos-api entry point
//!
//! Bootstraps tracing, configuration, the optional database pool and
//! OAuth provider, hydrates the in-memory directory, and serves the app.

use std::process::ExitCode;

use kudos_api::state::AppState;
use kudos_api::{app, AppConfig};
use kudos_auth::OAuthProvider;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    let port = config.port;

    let oauth = OAuthProvider::from_env()?;
    if oauth.is_none() {
        tracing::info!("OAuth login disabled (KUDOS_OAUTH_CLIENT_ID not set)");
    }

    let db_pool = kudos_api::db::init_pool().await?;

    let state = AppState::with_config(config, db_pool, oauth);

    // Hydration runs before the listener binds; nothing else holds the
    // directory lock yet.
    if let Some(pool) = state.db_pool.clone() {
        let mut fresh = kudos_api::state::Directory::default();
        kudos_api::db::hydrate(&pool, &mut fresh).await?;
        *state.directory.write() = fresh;
    }

    let router = app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "kudos-api listening");
    axum::serve(listener, router).await?;
    Ok(())
}
