mod config;
mod plan_cmds;
mod profile_args;
mod recipe_cmd;
mod shopping_cmd;
mod targets_cmd;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use ration_core::cache::Caches;
use ration_core::generation::{GenerationClient, OpenAiTransport};
use ration_core::planner::{MealPlanner, PlannerConfig};
use ration_core::store::PgPlanStore;
use ration_db::pool;

use config::{CliOverrides, RationConfig};
use plan_cmds::PlanTarget;
use profile_args::ProfileArgs;

#[derive(Parser)]
#[command(name = "ration", about = "Weekly meal plans, recipes and shopping lists")]
struct Cli {
    /// Database URL (overrides RATION_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Chat completion model (overrides RATION_MODEL env var)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible API (overrides RATION_BASE_URL env var)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            database_url: self.database_url.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a ration config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/ration")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the ration database (requires config file or env vars)
    DbInit,
    /// Compute daily calorie and macro targets from body metrics
    Targets {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Week plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Print the shopping list of a saved week plan
    ShoppingList {
        #[command(flatten)]
        target: PlanTarget,
    },
    /// Print the stored recipe of a meal
    Recipe {
        /// Meal ID
        meal_id: String,
    },
    /// Aggregate free-text ingredient lines into a shopping list
    Aggregate {
        /// File with one ingredient per line ("-" reads stdin)
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate and save a week plan, then enrich it with recipes
    Generate {
        /// Owner of the plan
        #[arg(long)]
        user_id: i64,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Ignore the 7-day cooldown
        #[arg(long)]
        force: bool,
        /// Seconds to wait for recipe enrichment before exiting
        #[arg(long, default_value_t = 600)]
        wait_secs: u64,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a saved week plan
    Show {
        #[command(flatten)]
        target: PlanTarget,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether a user may generate a new plan
    Cooldown {
        #[arg(long)]
        user_id: i64,
    },
}

pub(crate) fn parse_id(kind: &str, raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid {kind} ID: {raw}"))
}

/// Execute the `ration init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        ..Default::default()
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!(
        "Set {} (or {}) before generating plans.",
        config::API_KEY_ENV,
        config::FALLBACK_API_KEY_ENV
    );
    println!("Next: run `ration db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `ration db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &RationConfig) -> anyhow::Result<()> {
    println!("Initializing ration database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::store_counts(&db_pool).await?;
    println!("Database ready.");
    println!("  week plans: {}", counts.week_plans);
    println!("  meals:      {} ({} with recipe)", counts.meals, counts.meals_with_recipe);

    db_pool.close().await;

    println!("ration db-init complete.");
    Ok(())
}

/// Wire a planner over the Postgres store and the configured generation
/// service.
fn build_planner(resolved: &RationConfig, store: PgPlanStore) -> anyhow::Result<MealPlanner> {
    let transport = OpenAiTransport::new(resolved.base_url.clone(), resolved.api_key()?)?;
    let client = GenerationClient::new(Arc::new(transport), resolved.generation.clone());
    Ok(MealPlanner::new(
        Arc::new(client),
        Arc::new(store),
        Arc::new(Caches::new(resolved.plan_ttl, resolved.recipe_ttl)),
        PlannerConfig {
            enrichment_workers: resolved.enrichment_workers,
        },
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = cli.overrides();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            let resolved = RationConfig::resolve(&overrides)?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Targets { profile } => {
            targets_cmd::run_targets(&profile)?;
        }
        Commands::Aggregate { file } => {
            shopping_cmd::run_aggregate(&file)?;
        }
        Commands::Plan { command } => {
            let resolved = RationConfig::resolve(&overrides)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store = PgPlanStore::new(db_pool.clone());
            let result = match command {
                PlanCommands::Generate {
                    user_id,
                    profile,
                    force,
                    wait_secs,
                    json,
                } => match build_planner(&resolved, store) {
                    Ok(planner) => {
                        let options = plan_cmds::GenerateOptions {
                            user_id,
                            force,
                            wait: std::time::Duration::from_secs(wait_secs),
                            json,
                        };
                        plan_cmds::cmd_generate(&planner, &profile, options).await
                    }
                    Err(e) => Err(e),
                },
                PlanCommands::Show { target, json } => plan_cmds::cmd_show(&store, &target, json).await,
                PlanCommands::Cooldown { user_id } => plan_cmds::cmd_cooldown(&store, user_id).await,
            };
            db_pool.close().await;
            result?;
        }
        Commands::ShoppingList { target } => {
            let resolved = RationConfig::resolve(&overrides)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store = PgPlanStore::new(db_pool.clone());
            let result = shopping_cmd::run_shopping_list(&store, &target).await;
            db_pool.close().await;
            result?;
        }
        Commands::Recipe { meal_id } => {
            let resolved = RationConfig::resolve(&overrides)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store = PgPlanStore::new(db_pool.clone());
            let result = recipe_cmd::run_recipe(&store, &meal_id).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
