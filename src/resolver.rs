//! Resolve a query to the URL to redirect to
//!
//! The alias is looked up first. When it does not resolve, the fallback alias is tried, and
//! after that the default fallback. Destinations reached through a fallback get the whole
//! query, failed alias text included, as their only argument.

use thiserror::Error;

use crate::destinations;
use crate::destinations::Destination;
use crate::destinations::LookupError;
use crate::storage::Storage;
use crate::templates::format_url;
use crate::urls::escape_argument;

/// Alias that always shows the listing of destinations
pub const LIST_ALIAS: &str = "list";

/// Where a query leads
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Redirect to this URL
    Redirect(String),

    /// Show the listing of destinations
    List,
}

/// Query could not be resolved
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The destination needs more arguments than were supplied
    #[error("must provide at least {expected} arguments (got {supplied})")]
    BadRequest {
        /// Arguments the destination needs
        expected: usize,

        /// Arguments supplied
        supplied: usize,
    },

    /// Nothing the user can do about it
    #[error("{0}")]
    Server(String),
}

/// How the destination was found
#[derive(Debug, PartialEq, Eq)]
enum Flow<'a> {
    /// Alias resolved to a regular destination
    Direct,

    /// Alias resolved to a fallback destination
    DirectFallback,

    /// Alias did not resolve, a fallback took over
    AsFallback {
        /// Alias text that did not resolve
        failed_alias: Option<&'a str>,
    },
}

/// Resolve a query
///
/// `alias` and `fallback_alias` are ignored when empty. Arguments are escaped before they end
/// up in the URL.
pub async fn resolve<S>(
    storage: &S,
    alias: Option<&str>,
    arguments: &[String],
    fallback_alias: Option<&str>,
) -> Result<Resolution, ResolveError>
where
    S: Storage,
{
    let alias = alias.map(str::trim).filter(|alias| !alias.is_empty());
    let fallback_alias = fallback_alias
        .map(str::trim)
        .filter(|alias| !alias.is_empty());

    if alias == Some(LIST_ALIAS) {
        return Ok(Resolution::List);
    }

    let (destination, flow) = find_destination(storage, alias, fallback_alias).await?;

    tracing::debug!(
        "Resolved {:?} to destination {} ({:?})",
        alias,
        destination.id,
        flow
    );

    let Some(arguments) = reconcile_arguments(&destination, &flow, arguments)? else {
        return Ok(Resolution::Redirect(destination.url));
    };

    let arguments = arguments
        .iter()
        .map(|argument| escape_argument(argument))
        .collect::<Vec<_>>();

    match format_url(&destination.url, &arguments) {
        Ok(url) => Ok(Resolution::Redirect(url)),
        Err(err) => {
            tracing::warn!(
                "Could not format destination {} ({}), using default fallback: {err}",
                destination.id,
                destination.url
            );

            let fallback = default_fallback(storage).await?;

            format_url(&fallback.url, &[""])
                .map(Resolution::Redirect)
                .map_err(|err| {
                    ResolveError::Server(format!(
                        "Could not format default fallback {}: {err}",
                        fallback.id
                    ))
                })
        }
    }
}

/// Find the destination for the alias, falling through to the fallbacks
async fn find_destination<'a, S>(
    storage: &S,
    alias: Option<&'a str>,
    fallback_alias: Option<&str>,
) -> Result<(Destination, Flow<'a>), ResolveError>
where
    S: Storage,
{
    if let Some(alias) = alias {
        if let Some(destination) = find_by_alias(storage, alias).await? {
            let flow = if destination.is_fallback {
                Flow::DirectFallback
            } else {
                Flow::Direct
            };

            return Ok((destination, flow));
        }
    }

    let flow = Flow::AsFallback {
        failed_alias: alias,
    };

    if let Some(fallback_alias) = fallback_alias {
        if let Some(destination) = find_by_alias(storage, fallback_alias).await? {
            return Ok((destination, flow));
        }

        tracing::debug!(r#"Fallback alias "{fallback_alias}" does not resolve"#);
    }

    Ok((default_fallback(storage).await?, flow))
}

/// Find a destination by alias, storage failures are server errors
async fn find_by_alias<S>(storage: &S, alias: &str) -> Result<Option<Destination>, ResolveError>
where
    S: Storage,
{
    destinations::find_by_alias(storage, alias)
        .await
        .map_err(|err| ResolveError::Server(err.to_string()))
}

/// Find the default fallback, not having one is a server error
async fn default_fallback<S>(storage: &S) -> Result<Destination, ResolveError>
where
    S: Storage,
{
    destinations::default_fallback(storage)
        .await
        .map_err(|err| match err {
            LookupError::NotFound => {
                ResolveError::Server("No default fallback destination, not bootstrapped?".into())
            }
            LookupError::Storage(err) => ResolveError::Server(err.to_string()),
        })
}

/// Fit the supplied arguments to the destination
///
/// `None` means the destination URL is used as is.
fn reconcile_arguments(
    destination: &Destination,
    flow: &Flow<'_>,
    arguments: &[String],
) -> Result<Option<Vec<String>>, ResolveError> {
    match flow {
        Flow::AsFallback { failed_alias } => {
            let query = failed_alias
                .iter()
                .copied()
                .chain(arguments.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");

            Ok(Some(vec![query]))
        }
        Flow::DirectFallback => Ok(Some(vec![arguments.join(" ")])),
        Flow::Direct if destination.num_args == 0 => Ok(None),
        Flow::Direct => {
            let expected = destination.num_args;

            if arguments.len() < expected {
                return Err(ResolveError::BadRequest {
                    expected,
                    supplied: arguments.len(),
                });
            }

            let mut reconciled = arguments[..expected - 1].to_vec();
            reconciled.push(arguments[expected - 1..].join(" "));

            Ok(Some(reconciled))
        }
    }
}
