//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;

pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use response::Error;
pub use response::Success;

use crate::storage::Storage;

mod destinations;
mod health;
mod request;
mod response;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let destinations = Router::new()
        .route(
            "/",
            get(destinations::list::<S>).post(destinations::create::<S>),
        )
        .route(
            "/{destination}",
            get(destinations::single::<S>).delete(destinations::delete::<S>),
        );

    Router::new()
        .nest("/destinations", destinations)
        .route(
            "/default-fallback",
            delete(destinations::clear_default_fallback::<S>),
        )
        .route("/health", get(health::check::<S>))
}
