//! Configuration from the environment
//!
//! Values are read once at startup. Empty values are treated as not set.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

use crate::storage::PostgresConfig;

/// Address to listen on when `ADDRESS` is not set
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT: u64 = 3;

/// Search engine that becomes the default fallback when bootstrapping
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DefaultFallback {
    #[default]
    DuckDuckGo,
    Google,
}

impl FromStr for DefaultFallback {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            "google" => Ok(Self::Google),
            _ => bail!(r#"Unknown default fallback "{value}", expected "duckduckgo" or "google""#),
        }
    }
}

/// Resolved configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Socket address to listen on
    pub address: SocketAddr,

    /// Postgres settings, memory storage is used without them
    pub database: Option<PostgresConfig>,

    /// Seed common destinations when there is no default fallback
    pub bootstrap: bool,

    /// Default fallback when bootstrapping
    pub default_fallback: DefaultFallback,
}

impl Config {
    /// Read the configuration from the environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read the configuration with a custom variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let address = var("ADDRESS").unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let mut address = address
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid `ADDRESS`: {address}"))?;

        // optional override of just the port
        if let Some(port) = var("PORT") {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid `PORT`: {port}"))?;

            address.set_port(port);
        }

        let database = match var("DATABASE_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: parse_var(&var, "DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS),
                acquire_timeout: Duration::from_secs(
                    parse_var(&var, "DATABASE_ACQUIRE_TIMEOUT")?
                        .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
                ),
            }),
            None => None,
        };

        let bootstrap = match var("BOOTSTRAP") {
            Some(value) => parse_bool(&value).context("Invalid `BOOTSTRAP`")?,
            None => true,
        };

        let default_fallback = parse_var(&var, "DEFAULT_FALLBACK")?.unwrap_or_default();

        Ok(Self {
            address,
            database,
            bootstrap,
            default_fallback,
        })
    }
}

/// Get the value of ENV var, or a default
///
/// Only when:
/// - It is set
/// - It is not empty
pub fn env_var_or_else(var_name: &'static str, or_else: fn() -> String) -> String {
    if let Ok(value) = std::env::var(var_name) {
        if !value.is_empty() {
            return value;
        }
    }

    or_else()
}

fn parse_var<V, T>(var: V, name: &str) -> Result<Option<T>>
where
    V: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|err| anyhow::anyhow!("Invalid `{name}` ({value}): {err}"))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Expected a boolean, got {value}"),
    }
}
