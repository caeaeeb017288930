//! All things related to the storage of destinations and aliases

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::aliases::Alias;
use crate::destinations::Destination;

pub use memory::Memory;
pub use postgres::Postgres;
pub use postgres::PostgresConfig;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),

    /// A unique constraint was violated, nothing is changed
    #[error("{0}")]
    Conflict(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a Destination with its aliases
///
/// Everything is validated already, storage only enforces uniqueness
pub struct CreateDestinationValues<'a> {
    /// The (normalized) URL template
    pub url: &'a str,

    /// Number of positional placeholders in the URL
    pub num_args: usize,

    /// Usable as fallback
    pub is_fallback: bool,

    /// Becomes the one and only default fallback
    pub is_default_fallback: bool,

    /// Free-text label
    pub description: &'a str,

    /// Normalized alias names
    pub aliases: &'a BTreeSet<String>,
}

/// Storage with all supported operations
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Check the storage can be reached
    async fn health_check(&self) -> Result<()>;

    /// Find all destinations
    ///
    /// Ordered by description, then URL
    async fn find_all_destinations(&self) -> Result<Vec<Destination>>;

    /// Find all aliases of all destinations
    async fn find_all_aliases(&self) -> Result<Vec<Alias>>;

    /// Find the aliases of a single destination, ordered by name
    async fn find_aliases_for_destination(&self, destination: &Destination) -> Result<Vec<Alias>>;

    /// Find a single destination by ID
    async fn find_single_destination_by_id(&self, id: &Uuid) -> Result<Option<Destination>>;

    /// Find a single destination by the exact (normalized) name of one of its aliases
    async fn find_single_destination_by_alias(&self, name: &str) -> Result<Option<Destination>>;

    /// Find all destinations flagged as default fallback
    ///
    /// Oldest first, ties broken by ID
    async fn find_default_fallbacks(&self) -> Result<Vec<Destination>>;

    /// Create a destination with its aliases
    ///
    /// Atomic: existing default fallbacks are only cleared when the destination and all of its
    /// aliases are stored as well
    async fn create_destination(&self, values: &CreateDestinationValues) -> Result<Destination>;

    /// Remove the default fallback flag from all destinations
    ///
    /// Returns the number of destinations that lost the flag
    async fn clear_default_fallbacks(&self) -> Result<u64>;

    /// Delete a destination, its aliases go with it
    async fn delete_destination(&self, destination: &Destination) -> Result<()>;
}
