use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::migrate::MigrateDatabase;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/ration-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool sized by [`DbConfig::max_connections`].
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Apply the `week_plans`/`meals` schema.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!("migrations applied successfully");
    Ok(())
}

/// Create the configured database if the server does not have it yet.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let url = config.database_url.as_str();
    let exists = Postgres::database_exists(url)
        .await
        .with_context(|| format!("failed to check for database at {url}"))?;

    if exists {
        info!("database already exists");
    } else {
        Postgres::create_database(url)
            .await
            .with_context(|| format!("failed to create database at {url}"))?;
        info!("database created");
    }
    Ok(())
}

/// Row totals reported by `ration db-init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct StoreCounts {
    pub week_plans: i64,
    pub meals: i64,
    pub meals_with_recipe: i64,
}

/// Count stored plans, meals, and meals whose recipe has been written.
pub async fn store_counts(pool: &PgPool) -> Result<StoreCounts> {
    let counts = sqlx::query_as::<_, StoreCounts>(
        "SELECT (SELECT COUNT(*) FROM week_plans) AS week_plans, \
                (SELECT COUNT(*) FROM meals) AS meals, \
                (SELECT COUNT(*) FROM meals WHERE recipe IS NOT NULL) AS meals_with_recipe",
    )
    .fetch_one(pool)
    .await
    .context("failed to count stored week plans")?;

    Ok(counts)
}
