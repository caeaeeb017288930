//! The root!
//!
//! The most important part of Hare, turning a query into a redirect

use axum::Extension;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use percent_encoding::CONTROLS;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;

use crate::api::Error;
use crate::api::Form;
use crate::api::QueryParameters;
use crate::resolver::Resolution;
use crate::resolver::ResolveError;
use crate::resolver::resolve;
use crate::storage::Storage;

/// Path of the listing of destinations
pub const LIST_PATH: &str = "/list";

/// Parameters for the root, from the query string or a JSON body
#[derive(Debug, Default, Deserialize)]
pub struct RootParameters {
    /// Alias followed by its arguments, separated by spaces
    query: Option<String>,

    /// Alias to use when the alias of the query does not resolve
    fallback: Option<String>,
}

/// The root!
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/?query=w+rust&fallback=ddg'
/// ```
pub async fn root<S: Storage>(
    Extension(storage): Extension<S>,
    QueryParameters(parameters): QueryParameters<RootParameters>,
) -> Result<(StatusCode, HeaderMap), Error> {
    redirect(&storage, &parameters).await
}

/// The root, with parameters in a JSON body
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "query": "w rust", "fallback": "ddg" }' \
///     http://localhost:6000/
/// ```
pub async fn root_form<S: Storage>(
    Extension(storage): Extension<S>,
    Form(parameters): Form<RootParameters>,
) -> Result<(StatusCode, HeaderMap), Error> {
    redirect(&storage, &parameters).await
}

async fn redirect<S: Storage>(
    storage: &S,
    parameters: &RootParameters,
) -> Result<(StatusCode, HeaderMap), Error> {
    let (alias, arguments) = parse_query(parameters.query.as_deref().unwrap_or_default());

    tracing::debug!(
        "Resolving alias {:?} with {} argument(s), fallback {:?}",
        alias,
        arguments.len(),
        parameters.fallback
    );

    let resolution = resolve(
        storage,
        alias,
        &arguments,
        parameters.fallback.as_deref(),
    )
    .await
    .map_err(resolve_error)?;

    let location = match resolution {
        // templates may hold non-ASCII characters, headers can not
        Resolution::Redirect(url) => utf8_percent_encode(&url, CONTROLS).to_string(),
        Resolution::List => LIST_PATH.to_string(),
    };

    tracing::debug!("Redirecting to: {location}");

    let mut headers = HeaderMap::new();
    headers.insert(
        LOCATION,
        HeaderValue::from_str(&location).map_err(|err| {
            tracing::error!("Invalid redirect location {location}: {err}");

            Error::internal_server_error("Internal server error")
        })?,
    );

    Ok((StatusCode::TEMPORARY_REDIRECT, headers))
}

/// Split a query in its alias and arguments
///
/// Tokens are separated by single spaces, empty tokens are not arguments. A blank query has no
/// alias.
pub fn parse_query(query: &str) -> (Option<&str>, Vec<String>) {
    let mut tokens = query.trim().split(' ');

    let alias = tokens.next().filter(|alias| !alias.is_empty());
    let arguments = tokens
        .filter(|argument| !argument.is_empty())
        .map(ToString::to_string)
        .collect();

    (alias, arguments)
}

/// Map resolve errors to responses, server errors are only logged in detail
fn resolve_error(err: ResolveError) -> Error {
    match err {
        ResolveError::BadRequest { .. } => {
            Error::bad_request("Not enough arguments").with_description(err)
        }
        ResolveError::Server(message) => {
            tracing::error!("Could not resolve query: {message}");

            Error::internal_server_error("Internal server error")
        }
    }
}
