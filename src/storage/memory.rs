//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::aliases::Alias;
use crate::destinations::Destination;

use super::CreateDestinationValues;
use super::Error;
use super::Result;
use super::Storage;

/// All tables, behind a single lock so every operation is atomic
#[derive(Debug, Default)]
struct Tables {
    /// All destinations in storage
    destinations: HashMap<Uuid, Destination>,

    /// All aliases in storage
    aliases: HashMap<Uuid, Alias>,
}

impl Tables {
    /// Destinations flagged as default fallback, oldest first
    fn default_fallbacks(&self) -> Vec<Destination> {
        let mut fallbacks = self
            .destinations
            .values()
            .filter(|destination| destination.is_default_fallback)
            .cloned()
            .collect::<Vec<_>>();

        fallbacks.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        fallbacks
    }

    /// Check unique constraints before anything is written
    fn check_unique(&self, values: &CreateDestinationValues) -> Result<()> {
        if self
            .destinations
            .values()
            .any(|destination| destination.url == values.url)
        {
            return Err(Error::Conflict(format!(
                "Destination with URL {} already exists",
                values.url
            )));
        }

        if let Some(alias) = self
            .aliases
            .values()
            .find(|alias| values.aliases.contains(&alias.name))
        {
            return Err(Error::Conflict(format!(
                r#"Alias "{}" already exists"#,
                alias.name
            )));
        }

        Ok(())
    }
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug)]
pub struct Memory {
    /// All tables
    tables: Arc<Mutex<Tables>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for Memory {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn find_all_destinations(&self) -> Result<Vec<Destination>> {
        let mut destinations = self
            .tables
            .lock()
            .await
            .destinations
            .values()
            .cloned()
            .collect::<Vec<_>>();

        destinations.sort_by(|a, b| {
            (&a.description, &a.url).cmp(&(&b.description, &b.url))
        });

        Ok(destinations)
    }

    async fn find_all_aliases(&self) -> Result<Vec<Alias>> {
        Ok(self
            .tables
            .lock()
            .await
            .aliases
            .values()
            .cloned()
            .collect())
    }

    async fn find_aliases_for_destination(&self, destination: &Destination) -> Result<Vec<Alias>> {
        let mut aliases = self
            .tables
            .lock()
            .await
            .aliases
            .values()
            .filter(|alias| alias.destination_id == destination.id)
            .cloned()
            .collect::<Vec<_>>();

        aliases.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(aliases)
    }

    async fn find_single_destination_by_id(&self, id: &Uuid) -> Result<Option<Destination>> {
        Ok(self.tables.lock().await.destinations.get(id).cloned())
    }

    async fn find_single_destination_by_alias(&self, name: &str) -> Result<Option<Destination>> {
        let tables = self.tables.lock().await;

        Ok(tables
            .aliases
            .values()
            .find(|alias| alias.name == name)
            .and_then(|alias| tables.destinations.get(&alias.destination_id))
            .cloned())
    }

    async fn find_default_fallbacks(&self) -> Result<Vec<Destination>> {
        Ok(self.tables.lock().await.default_fallbacks())
    }

    async fn create_destination(&self, values: &CreateDestinationValues) -> Result<Destination> {
        let mut tables = self.tables.lock().await;

        tables.check_unique(values)?;

        if values.is_default_fallback {
            for destination in tables.destinations.values_mut() {
                destination.is_default_fallback = false;
            }
        }

        let destination = Destination {
            id: Uuid::new_v4(),
            url: values.url.to_string(),
            num_args: values.num_args,
            is_fallback: values.is_fallback,
            is_default_fallback: values.is_default_fallback,
            description: values.description.to_string(),
            created_at: Utc::now().naive_utc(),
        };

        for name in values.aliases {
            let alias = Alias {
                id: Uuid::new_v4(),
                name: name.clone(),
                destination_id: destination.id,
            };

            tables.aliases.insert(alias.id, alias);
        }

        tables
            .destinations
            .insert(destination.id, destination.clone());

        Ok(destination)
    }

    async fn clear_default_fallbacks(&self) -> Result<u64> {
        let mut cleared = 0;

        for destination in self.tables.lock().await.destinations.values_mut() {
            if destination.is_default_fallback {
                destination.is_default_fallback = false;
                cleared += 1;
            }
        }

        Ok(cleared)
    }

    async fn delete_destination(&self, destination: &Destination) -> Result<()> {
        let mut tables = self.tables.lock().await;

        tables.destinations.remove(&destination.id);
        tables
            .aliases
            .retain(|_, alias| alias.destination_id != destination.id);

        Ok(())
    }
}
