#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use anyhow::Context;
use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::bootstrap::ensure_default_destinations;
use crate::config::Config;
use crate::config::env_var_or_else;
use crate::root::LIST_PATH;
use crate::storage::Memory;
use crate::storage::Postgres;
use crate::storage::Storage;

mod aliases;
mod api;
mod bootstrap;
mod config;
mod destinations;
mod graceful_shutdown;
mod list;
mod resolver;
mod root;
mod storage;
mod templates;
#[cfg(test)]
mod tests;
mod urls;

const DEFAULT_RUST_LOG: &str = "hare=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let config = Config::from_env()?;

    let app = setup_app(&config).await?;

    let listener = TcpListener::bind(config.address)
        .await
        .with_context(|| format!("Could not listen on {}", config.address))?;
    tracing::info!("Listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// Postgres is used when `DATABASE_URL` is set, memory storage otherwise.
///
/// # Errors
///
/// Will return `Err` when the database connection or its migrations fail
pub async fn setup_app(config: &Config) -> Result<Router> {
    if let Some(database) = &config.database {
        tracing::info!("Using Postgres storage");

        let storage = Postgres::connect(database)
            .await
            .context("Could not set up Postgres storage")?;

        Ok(prepare(storage, config).await)
    } else {
        tracing::info!("`DATABASE_URL` is not set, using memory storage");

        Ok(prepare(Memory::new(), config).await)
    }
}

/// Bootstrap the storage when needed and create the router on top of it
async fn prepare<S: Storage>(storage: S, config: &Config) -> Router {
    if config.bootstrap {
        ensure_default_destinations(&storage, config.default_fallback).await;
    }

    create_router(storage)
}

/// Create the router for Hare
fn create_router<S: Storage>(storage: S) -> Router {
    Router::new()
        .route("/", get(root::root::<S>).post(root::root_form::<S>))
        .route(LIST_PATH, get(list::list::<S>))
        .nest("/api", api::router::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(env_var_or_else("RUST_LOG", || {
            DEFAULT_RUST_LOG.into()
        })))
        .with(fmt::layer())
        .init();
}
