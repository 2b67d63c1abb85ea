use std::env;

/// Connections kept free for the request path while enrichment workers
/// each hold one.
const RESERVED_CONNECTIONS: u32 = 2;

/// Where the week-plan store lives and how many connections it may use.
///
/// [`DbConfig::from_env`] reads `RATION_DATABASE_URL`, falling back to
/// `postgresql://localhost:5432/ration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/ration";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "RATION_DATABASE_URL";

    /// Pool size for the default three enrichment workers.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 3 + RESERVED_CONNECTIONS;

    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self::new(database_url)
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Size the pool so `workers` concurrent recipe writes never starve
    /// plan reads.
    pub fn with_enrichment_workers(mut self, workers: usize) -> Self {
        let workers = u32::try_from(workers).unwrap_or(u32::MAX);
        self.max_connections = workers.saturating_add(RESERVED_CONNECTIONS).max(1);
        self
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_pool_size() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_url, "postgresql://localhost:5432/ration");
        assert_eq!(cfg.max_connections, 5);
    }

    #[test]
    fn pool_grows_with_enrichment_workers() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL).with_enrichment_workers(8);
        assert_eq!(cfg.max_connections, 10);

        let cfg = DbConfig::new(DbConfig::DEFAULT_URL).with_enrichment_workers(0);
        assert_eq!(cfg.max_connections, 2);
    }

    #[test]
    fn absurd_worker_count_saturates() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL).with_enrichment_workers(usize::MAX);
        assert_eq!(cfg.max_connections, u32::MAX);
    }
}
