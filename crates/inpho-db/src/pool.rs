//! Connection pool for the entity store and graph edge tables.
//!
//! A mining run needs few connections: term and document loads run before
//! scanning, and publishing holds a single transaction per partition.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `INPHO_DB_MAX_CONNECTIONS` | 4 |
//! | `INPHO_DB_ACQUIRE_TIMEOUT_SECS` | 30 |

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use inpho_core::{Error, Result};

pub const ENV_MAX_CONNECTIONS: &str = "INPHO_DB_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "INPHO_DB_ACQUIRE_TIMEOUT_SECS";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Sizing and timeouts of the store pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a repository call waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the environment; unset or unparsable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(n) = lookup(ENV_MAX_CONNECTIONS).and_then(|v| v.trim().parse().ok()) {
            config.max_connections = n;
        }
        if let Some(secs) = lookup(ENV_ACQUIRE_TIMEOUT_SECS).and_then(|v| v.trim().parse().ok()) {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::Config(format!(
                "{} must be at least 1",
                ENV_MAX_CONNECTIONS
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(Error::Config(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

/// Connect with the default pool sizing.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Connect with explicit pool sizing.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    config.validate()?;
    let start = Instant::now();
    debug!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Connecting to entity store"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(IDLE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Entity store connected"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = PoolConfig::from_lookup(lookup(&[
            (ENV_MAX_CONNECTIONS, "8"),
            (ENV_ACQUIRE_TIMEOUT_SECS, "5"),
        ]));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_unparsable_env_keeps_default() {
        let config = PoolConfig::from_lookup(lookup(&[(ENV_MAX_CONNECTIONS, "many")]));
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_sizing() {
        assert!(matches!(
            PoolConfig::new().max_connections(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(PoolConfig::new()
            .max_connections(2)
            .min_connections(3)
            .validate()
            .is_err());
        assert!(PoolConfig::new().validate().is_ok());
    }
}
