//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::aliases::Alias;
use crate::destinations::Destination;

use super::CreateDestinationValues;
use super::Error;
use super::Result;
use super::Storage;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Advisory lock key taken by every transaction that sets a default fallback
const DEFAULT_FALLBACK_LOCK_KEY: i64 = 0x6861_7265;

/// Connection settings
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    /// Connection string
    pub url: String,

    /// Size of the pool
    pub max_connections: u32,

    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

/// Postgres storage
#[derive(Clone, Debug)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Connect to Postgres
    ///
    /// Migrations will be run
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(storage_error)?;

        Self::from_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn from_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

/// `SQLx` version of destination
#[derive(sqlx::FromRow)]
struct SqlxDestination {
    /// Destination ID
    id: Uuid,

    /// URL template
    url: String,

    /// Placeholder count
    num_args: i32,

    /// Usable as fallback
    is_fallback: bool,

    /// The default fallback
    is_default_fallback: bool,

    /// Free-text label
    description: String,

    /// Creation date
    created_at: NaiveDateTime,
}

/// `SQLx` version of alias
#[derive(sqlx::FromRow)]
struct SqlxAlias {
    /// Alias ID
    id: Uuid,

    /// Normalized name
    name: String,

    /// Owning destination
    destination_id: Uuid,
}

impl Destination {
    /// Create destination from `SQLx` version
    fn from_sqlx_destination(destination: SqlxDestination) -> Self {
        Self {
            id: destination.id,
            url: destination.url,
            num_args: usize::try_from(destination.num_args).unwrap_or_default(),
            is_fallback: destination.is_fallback,
            is_default_fallback: destination.is_default_fallback,
            description: destination.description,
            created_at: destination.created_at,
        }
    }

    /// Create multiple destinations from `SQLx` version
    fn from_sqlx_destination_multiple(destinations: Vec<SqlxDestination>) -> Vec<Self> {
        destinations
            .into_iter()
            .map(Self::from_sqlx_destination)
            .collect()
    }
}

impl Alias {
    /// Create alias from `SQLx` version
    fn from_sqlx_alias(alias: SqlxAlias) -> Self {
        Self {
            id: alias.id,
            name: alias.name,
            destination_id: alias.destination_id,
        }
    }
}

#[async_trait]
impl Storage for Postgres {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn find_all_destinations(&self) -> Result<Vec<Destination>> {
        let destinations = sqlx::query_as::<_, SqlxDestination>(
            r"
            SELECT *
            FROM destinations
            ORDER BY description, url
            ",
        )
        .fetch_all(&self.connection_pool)
        .await
        .map(Destination::from_sqlx_destination_multiple)
        .map_err(storage_error)?;

        Ok(destinations)
    }

    async fn find_all_aliases(&self) -> Result<Vec<Alias>> {
        let aliases = sqlx::query_as::<_, SqlxAlias>(
            r"
            SELECT *
            FROM aliases
            ORDER BY name
            ",
        )
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(aliases.into_iter().map(Alias::from_sqlx_alias).collect())
    }

    async fn find_aliases_for_destination(&self, destination: &Destination) -> Result<Vec<Alias>> {
        let aliases = sqlx::query_as::<_, SqlxAlias>(
            r"
            SELECT *
            FROM aliases
            WHERE destination_id = $1
            ORDER BY name
            ",
        )
        .bind(destination.id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(aliases.into_iter().map(Alias::from_sqlx_alias).collect())
    }

    async fn find_single_destination_by_id(&self, id: &Uuid) -> Result<Option<Destination>> {
        let destination = sqlx::query_as::<_, SqlxDestination>(
            r"
            SELECT *
            FROM destinations
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(destination.map(Destination::from_sqlx_destination))
    }

    async fn find_single_destination_by_alias(&self, name: &str) -> Result<Option<Destination>> {
        let destination = sqlx::query_as::<_, SqlxDestination>(
            r"
            SELECT destinations.*
            FROM destinations
            INNER JOIN aliases ON aliases.destination_id = destinations.id
            WHERE aliases.name = $1
            LIMIT 1
            ",
        )
        .bind(name)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(destination.map(Destination::from_sqlx_destination))
    }

    async fn find_default_fallbacks(&self) -> Result<Vec<Destination>> {
        let destinations = sqlx::query_as::<_, SqlxDestination>(
            r"
            SELECT *
            FROM destinations
            WHERE is_default_fallback
            ORDER BY created_at, id
            ",
        )
        .fetch_all(&self.connection_pool)
        .await
        .map(Destination::from_sqlx_destination_multiple)
        .map_err(storage_error)?;

        Ok(destinations)
    }

    async fn create_destination(&self, values: &CreateDestinationValues) -> Result<Destination> {
        let num_args = i32::try_from(values.num_args)
            .map_err(|_| Error::Conflict("URL has too many arguments".to_string()))?;

        // dropping the transaction without commit rolls everything back
        let mut transaction = self.connection_pool.begin().await.map_err(storage_error)?;

        if values.is_default_fallback {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(DEFAULT_FALLBACK_LOCK_KEY)
                .execute(&mut *transaction)
                .await
                .map_err(storage_error)?;

            sqlx::query(
                r"
                UPDATE destinations
                SET is_default_fallback = FALSE
                WHERE is_default_fallback
                ",
            )
            .execute(&mut *transaction)
            .await
            .map_err(storage_error)?;
        }

        let destination = sqlx::query_as::<_, SqlxDestination>(
            r"
            INSERT INTO destinations (id, url, num_args, is_fallback, is_default_fallback, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.url)
        .bind(num_args)
        .bind(values.is_fallback)
        .bind(values.is_default_fallback)
        .bind(values.description)
        .fetch_one(&mut *transaction)
        .await
        .map(Destination::from_sqlx_destination)
        .map_err(storage_error)?;

        for name in values.aliases {
            sqlx::query(
                r"
                INSERT INTO aliases (id, name, destination_id)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(destination.id)
            .execute(&mut *transaction)
            .await
            .map_err(storage_error)?;
        }

        transaction.commit().await.map_err(storage_error)?;

        Ok(destination)
    }

    async fn clear_default_fallbacks(&self) -> Result<u64> {
        let mut transaction = self.connection_pool.begin().await.map_err(storage_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(DEFAULT_FALLBACK_LOCK_KEY)
            .execute(&mut *transaction)
            .await
            .map_err(storage_error)?;

        let result = sqlx::query(
            r"
            UPDATE destinations
            SET is_default_fallback = FALSE
            WHERE is_default_fallback
            ",
        )
        .execute(&mut *transaction)
        .await
        .map_err(storage_error)?;

        transaction.commit().await.map_err(storage_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_destination(&self, destination: &Destination) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM destinations
            WHERE id = $1
            ",
        )
        .bind(destination.id)
        .execute(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

/// Convert `SQLx` errors to storage errors
///
/// Unique violations become conflicts, everything else is a connection error
fn storage_error(err: sqlx::Error) -> Error {
    if let Some(database_error) = err.as_database_error() {
        if database_error.is_unique_violation() {
            let message = match database_error.constraint() {
                Some("aliases_name_key") => "Alias already exists",
                Some("destinations_url_key") => "Destination with this URL already exists",
                Some("destinations_single_default_fallback") => {
                    "Another default fallback was set concurrently"
                }
                _ => "Unique constraint violation",
            };

            return Error::Conflict(message.to_string());
        }
    }

    Error::Connection(err.to_string())
}
