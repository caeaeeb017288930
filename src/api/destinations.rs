//! Destinations API endpoints
//!
//! Everything related to the destinations management

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::destinations::CreateError;
use crate::destinations::Destination;
use crate::destinations::DestinationWithAliases;
use crate::destinations::NewDestination;
use crate::destinations::create_with_aliases;
use crate::destinations::list_with_aliases;
use crate::destinations::normalize_aliases;
use crate::storage;
use crate::storage::Storage;

use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;

/// Destination response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationResponse {
    /// Destination ID
    pub id: Uuid,

    /// URL template root will redirect to
    pub url: String,

    /// Free-text label
    pub description: String,

    /// Number of arguments the URL takes
    pub num_args: usize,

    /// Used when an alias does not resolve
    pub is_fallback: bool,

    /// Used when nothing else resolves
    pub is_default_fallback: bool,

    /// Alias names, sorted
    pub aliases: Vec<String>,

    /// Creation date
    pub created_at: NaiveDateTime,
}

impl DestinationResponse {
    /// Create a response from a [`Destination`](Destination) and its alias names
    fn from_destination(destination: Destination, aliases: Vec<String>) -> Self {
        Self {
            id: destination.id,
            url: destination.url,
            description: destination.description,
            num_args: destination.num_args,
            is_fallback: destination.is_fallback,
            is_default_fallback: destination.is_default_fallback,
            aliases,
            created_at: destination.created_at,
        }
    }

    /// Create multiple responses from a listing
    fn from_listing(listing: Vec<DestinationWithAliases>) -> Vec<Self> {
        listing
            .into_iter()
            .map(|entry| Self::from_destination(entry.destination, entry.aliases))
            .collect()
    }
}

/// List all destinations with their aliases
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/destinations
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": "<uuid>", "url": "https://duckduckgo.com/?q={}", "aliases": ["d", "ddg"] ... } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<Vec<DestinationResponse>>, Error> {
    let listing = list_with_aliases(&storage)
        .await
        .map_err(storage_error)?;

    Ok(Success::ok(DestinationResponse::from_listing(listing)))
}

/// Get a single destination
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/destinations/<uuid>
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "<uuid>", "url": "https://duckduckgo.com/?q={}" ... } }
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    PathParameters(destination_id): PathParameters<Uuid>,
) -> Result<Success<DestinationResponse>, Error> {
    let destination = fetch_destination(&storage, &destination_id).await?;

    let aliases = storage
        .find_aliases_for_destination(&destination)
        .await
        .map_err(storage_error)?
        .into_iter()
        .map(|alias| alias.name)
        .collect();

    Ok(Success::ok(DestinationResponse::from_destination(
        destination,
        aliases,
    )))
}

/// Aliases, as a list or as a single comma separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AliasesField {
    /// `["yt", "youtube"]`
    List(Vec<String>),

    /// `"yt,youtube"`
    Joined(String),
}

impl AliasesField {
    fn into_names(self) -> Vec<String> {
        match self {
            Self::List(names) => names,
            Self::Joined(names) => names.split(',').map(ToString::to_string).collect(),
        }
    }
}

/// Create destination form
///
/// Fields to create a destination with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDestinationForm {
    /// URL template, a scheme is added when missing
    url: String,

    /// Free-text label
    description: Option<String>,

    /// At least one alias is needed
    ///
    /// The names are normalized:
    /// - Leading and trailing whitespace is removed
    /// - Unicode normalization
    /// - Percent encoding
    aliases: AliasesField,

    /// Register as fallback
    is_fallback: Option<bool>,

    /// Register as the default fallback, replacing the current one
    is_default_fallback: Option<bool>,
}

/// Create a destination based on the [`CreateDestinationForm`](CreateDestinationForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "url": "https://www.youtube.com/results?search_query={}", "description": "Search YouTube", "aliases": ["yt", "youtube"] }' \
///     http://localhost:6000/api/destinations
/// ```
///
/// Response
/// ```json
/// { "data": { "id": "<uuid>", "url": "https://www.youtube.com/results?search_query={}" ... } }
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    Form(form): Form<CreateDestinationForm>,
) -> Result<Success<DestinationResponse>, Error> {
    let aliases = form.aliases.into_names();

    let new = NewDestination {
        url: &form.url,
        description: form.description.as_deref().unwrap_or_default(),
        aliases: &aliases,
        is_fallback: form.is_fallback.unwrap_or(false),
        is_default_fallback: form.is_default_fallback.unwrap_or(false),
    };

    let destination = create_with_aliases(&storage, &new)
        .await
        .map_err(create_error)?;

    let aliases = normalize_aliases(&aliases).into_iter().collect();

    Ok(Success::created(DestinationResponse::from_destination(
        destination,
        aliases,
    )))
}

/// Delete a destination, together with its aliases
///
/// Request:
/// ```sh
/// curl -v -XDELETE http://localhost:6000/api/destinations/<uuid>
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    PathParameters(destination_id): PathParameters<Uuid>,
) -> Result<Success<&'static str>, Error> {
    let destination = fetch_destination(&storage, &destination_id).await?;

    storage
        .delete_destination(&destination)
        .await
        .map_err(storage_error)?;

    tracing::debug!("Deleted destination {} ({})", destination.id, destination.url);

    Ok(Success::<&'static str>::no_content())
}

/// Result of clearing the default fallback
#[derive(Debug, Serialize)]
pub struct ClearDefaultFallbackResponse {
    /// Destinations that are no longer the default fallback
    pub cleared: u64,
}

/// Make sure no destination is the default fallback
///
/// Until a new default fallback is created, queries that do not resolve fail.
///
/// Request:
/// ```sh
/// curl -v -XDELETE http://localhost:6000/api/default-fallback
/// ```
pub async fn clear_default_fallback<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<ClearDefaultFallbackResponse>, Error> {
    let cleared = storage
        .clear_default_fallbacks()
        .await
        .map_err(storage_error)?;

    tracing::info!("Cleared the default fallback of {cleared} destination(s)");

    Ok(Success::ok(ClearDefaultFallbackResponse { cleared }))
}

/// Fetch destination from storage
async fn fetch_destination<S: Storage>(
    storage: &S,
    destination_id: &Uuid,
) -> Result<Destination, Error> {
    storage
        .find_single_destination_by_id(destination_id)
        .await
        .map_err(storage_error)?
        .map_or_else(|| Err(Error::not_found("Destination not found")), Ok)
}

/// Caller mistakes are bad requests, the rest is logged
fn create_error(err: CreateError) -> Error {
    if err.is_validation() {
        Error::bad_request("Invalid destination").with_description(err)
    } else {
        tracing::error!("Could not create destination: {err}");

        Error::internal_server_error("Could not create destination")
    }
}

/// Storage failures are logged, the caller only gets a generic error
fn storage_error(err: storage::Error) -> Error {
    tracing::error!("Storage failure: {err}");

    Error::internal_server_error("Internal server error")
}
