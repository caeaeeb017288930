//! Aliases

use uuid::Uuid;

/// Alias for a destination
///
/// Names are unique over all destinations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alias {
    /// Alias ID
    pub id: Uuid,

    /// Normalized name, what users type
    pub name: String,

    /// Destination the alias points to
    pub destination_id: Uuid,
}
