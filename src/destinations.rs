//! Destinations and the operations that keep their invariants
//!
//! A destination is a URL template with zero or more positional placeholders, reachable through
//! one or more aliases. Fallback destinations take exactly one argument: the rest of the query.
//! At most one destination is the default fallback.

use std::collections::BTreeSet;
use std::collections::HashMap;

use chrono::naive::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::storage;
use crate::storage::CreateDestinationValues;
use crate::storage::Storage;
use crate::templates::InvalidTemplate;
use crate::templates::count_positional_args;
use crate::urls::InvalidUrl;
use crate::urls::normalize_alias;
use crate::urls::validate_netloc_url;

/// Destination
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    /// Destination ID
    pub id: Uuid,

    /// URL template to redirect to
    pub url: String,

    /// Number of positional placeholders in `url`
    pub num_args: usize,

    /// Can be used when an alias does not resolve
    pub is_fallback: bool,

    /// The fallback used when nothing else resolves
    pub is_default_fallback: bool,

    /// Free-text label
    pub description: String,

    /// Creation date
    pub created_at: NaiveDateTime,
}

/// Everything needed to register a destination
#[derive(Debug)]
pub struct NewDestination<'a> {
    /// URL template, validated and normalized before storing
    pub url: &'a str,

    /// Free-text label
    pub description: &'a str,

    /// Aliases, duplicates and empty names are dropped
    pub aliases: &'a [String],

    /// Register as fallback
    pub is_fallback: bool,

    /// Register as the default fallback, implies `is_fallback`
    pub is_default_fallback: bool,
}

/// Reasons a destination could not be created
#[derive(Debug, Error)]
pub enum CreateError {
    /// No non-empty alias given
    #[error("must provide at least one alias")]
    NoAliases,

    /// URL is not a web URL
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrl),

    /// URL has named placeholders or unbalanced braces
    #[error("invalid URL template, {0}")]
    InvalidTemplate(#[from] InvalidTemplate),

    /// Fallbacks take the whole query as their single argument
    #[error("fallback destinations must have exactly one argument (found {0})")]
    FallbackArity(usize),

    /// Storage refused or failed
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

impl CreateError {
    /// Whether the caller can fix this by sending different data
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(storage::Error::Connection(_)))
    }
}

/// Lookup of the default fallback failed
#[derive(Debug, Error)]
pub enum LookupError {
    /// No default fallback registered
    #[error("must have a default fallback destination")]
    NotFound,

    /// Storage failed
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// A destination together with the names of its aliases
#[derive(Clone, Debug)]
pub struct DestinationWithAliases {
    /// The destination
    pub destination: Destination,

    /// Alias names, sorted alphabetically
    pub aliases: Vec<String>,
}

/// Validate and register a destination with its aliases
///
/// All validation happens before anything is written. Storage then clears any existing default
/// fallback (when needed) and inserts the destination with its aliases in one transaction.
pub async fn create_with_aliases<S>(
    storage: &S,
    new: &NewDestination<'_>,
) -> Result<Destination, CreateError>
where
    S: Storage,
{
    let aliases = normalize_aliases(new.aliases);

    if aliases.is_empty() {
        return Err(CreateError::NoAliases);
    }

    let url = validate_netloc_url(new.url)?;
    let num_args = count_positional_args(&url)?;

    let is_fallback = new.is_fallback || new.is_default_fallback;
    if is_fallback && num_args != 1 {
        return Err(CreateError::FallbackArity(num_args));
    }

    let values = CreateDestinationValues {
        url: &url,
        num_args,
        is_fallback,
        is_default_fallback: new.is_default_fallback,
        description: new.description,
        aliases: &aliases,
    };

    let destination = storage.create_destination(&values).await?;

    tracing::debug!(
        "Created destination {} ({}) with aliases {:?}",
        destination.id,
        destination.url,
        aliases
    );

    Ok(destination)
}

/// Normalize alias names, dropping empty names and duplicates
pub fn normalize_aliases<A>(aliases: &[A]) -> BTreeSet<String>
where
    A: AsRef<str>,
{
    aliases
        .iter()
        .map(|alias| alias.as_ref().trim())
        .filter(|alias| !alias.is_empty())
        .map(normalize_alias)
        .collect()
}

/// Find the destination an alias points to
///
/// Not finding anything is a regular outcome, not an error.
pub async fn find_by_alias<S>(storage: &S, name: &str) -> storage::Result<Option<Destination>>
where
    S: Storage,
{
    storage
        .find_single_destination_by_alias(&normalize_alias(name))
        .await
}

/// Find the default fallback destination
///
/// A missing default fallback means the store was never bootstrapped. When there is more than
/// one, the oldest wins.
pub async fn default_fallback<S>(storage: &S) -> Result<Destination, LookupError>
where
    S: Storage,
{
    let fallbacks = storage.find_default_fallbacks().await?;

    if fallbacks.len() > 1 {
        tracing::warn!(
            "Found {} default fallback destinations, using the oldest",
            fallbacks.len()
        );
    }

    fallbacks.into_iter().next().ok_or(LookupError::NotFound)
}

/// List all destinations with their aliases
///
/// Ordered by description, then URL. Aliases are sorted alphabetically per destination.
pub async fn list_with_aliases<S>(storage: &S) -> storage::Result<Vec<DestinationWithAliases>>
where
    S: Storage,
{
    let destinations = storage.find_all_destinations().await?;
    let aliases = storage.find_all_aliases().await?;

    let mut names_by_destination: HashMap<Uuid, Vec<String>> = HashMap::new();
    for alias in aliases {
        names_by_destination
            .entry(alias.destination_id)
            .or_default()
            .push(alias.name);
    }

    Ok(destinations
        .into_iter()
        .map(|destination| {
            let mut aliases = names_by_destination
                .remove(&destination.id)
                .unwrap_or_default();
            aliases.sort();

            DestinationWithAliases {
                destination,
                aliases,
            }
        })
        .collect())
}
