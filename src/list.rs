//! Listing of all destinations
//!
//! What the `list` alias redirects to

use axum::Extension;
use axum::Json;
use serde::Serialize;

use crate::api::Error;
use crate::destinations::list_with_aliases;
use crate::storage::Storage;

/// A destination as shown in the listing
#[derive(Debug, Serialize)]
pub struct ListEntry {
    /// URL template
    pub url: String,

    /// Free-text label
    pub description: String,

    /// Alias names, sorted
    pub aliases: Vec<String>,
}

/// All destinations with their aliases, ordered by description
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/list
/// ```
///
/// Response:
/// ```json
/// [ { "url": "https://duckduckgo.com/?q={}", "description": "DuckDuckGo", "aliases": ["d", "ddg", "duckduckgo"] } ]
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Json<Vec<ListEntry>>, Error> {
    let listing = list_with_aliases(&storage).await.map_err(|err| {
        tracing::error!("Could not list destinations: {err}");

        Error::internal_server_error("Internal server error")
    })?;

    Ok(Json(
        listing
            .into_iter()
            .map(|entry| ListEntry {
                url: entry.destination.url,
                description: entry.destination.description,
                aliases: entry.aliases,
            })
            .collect(),
    ))
}
