//! Configuration file management for ration.
//!
//! Provides a TOML config file at `~/.config/ration/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use ration_core::cache::{DEFAULT_PLAN_TTL, DEFAULT_RECIPE_TTL};
use ration_core::enrich::DEFAULT_WORKERS;
use ration_core::generation::{DEFAULT_BASE_URL, GenerationConfig};
use ration_db::config::DbConfig;

pub const API_KEY_ENV: &str = "RATION_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "RATION_MODEL";
pub const BASE_URL_ENV: &str = "RATION_BASE_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub enrichment: EnrichmentSection,
    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EnrichmentSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_ttl_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the ration config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/ration` or `~/.config/ration`,
/// also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("ration");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ration")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file is readable by its owner only.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub database_url: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct RationConfig {
    pub db_config: DbConfig,
    pub base_url: String,
    api_key: Option<String>,
    pub generation: GenerationConfig,
    pub enrichment_workers: usize,
    pub plan_ttl: Duration,
    pub recipe_ttl: Duration,
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl RationConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// - DB URL: `--database-url` > `RATION_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Base URL: `--base-url` > `RATION_BASE_URL` > `generation.base_url` > OpenAI
    /// - Model: `--model` > `RATION_MODEL` > `generation.model` > `gpt-4o-mini`
    /// - API key: `RATION_API_KEY` > `OPENAI_API_KEY`; only checked by [`RationConfig::api_key`]
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config().ok();
        let file = file.as_ref();

        let db_url = cli
            .database_url
            .clone()
            .or_else(|| env(DbConfig::ENV_VAR))
            .or_else(|| file.map(|f| f.database.url.clone()).filter(|u| !u.is_empty()))
            .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_owned());

        let base_url = cli
            .base_url
            .clone()
            .or_else(|| env(BASE_URL_ENV))
            .or_else(|| file.and_then(|f| f.generation.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        let defaults = GenerationConfig::default();
        let model = cli
            .model
            .clone()
            .or_else(|| env(MODEL_ENV))
            .or_else(|| file.and_then(|f| f.generation.model.clone()))
            .unwrap_or(defaults.model.clone());
        let max_attempts = file
            .and_then(|f| f.generation.max_attempts)
            .unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            bail!("generation.max_attempts must be at least 1");
        }
        let request_timeout = file
            .and_then(|f| f.generation.timeout_secs)
            .map_or(defaults.request_timeout, Duration::from_secs);

        let enrichment_workers = file
            .and_then(|f| f.enrichment.workers)
            .unwrap_or(DEFAULT_WORKERS);
        if enrichment_workers == 0 {
            bail!("enrichment.workers must be at least 1");
        }

        let plan_ttl = file
            .and_then(|f| f.cache.plan_ttl_secs)
            .map_or(DEFAULT_PLAN_TTL, Duration::from_secs);
        let recipe_ttl = file
            .and_then(|f| f.cache.recipe_ttl_secs)
            .map_or(DEFAULT_RECIPE_TTL, Duration::from_secs);

        Ok(Self {
            db_config: DbConfig::new(db_url).with_enrichment_workers(enrichment_workers),
            base_url,
            api_key: env(API_KEY_ENV).or_else(|| env(FALLBACK_API_KEY_ENV)),
            generation: GenerationConfig {
                model,
                max_attempts,
                request_timeout,
                ..defaults
            },
            enrichment_workers,
            plan_ttl,
            recipe_ttl,
        })
    }

    /// The generation service API key, required only by commands that
    /// generate.
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("API key not found; set {API_KEY_ENV} or {FALLBACK_API_KEY_ENV}"),
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::lock_env;

    const ALL_VARS: [&str; 6] = [
        "RATION_DATABASE_URL",
        API_KEY_ENV,
        FALLBACK_API_KEY_ENV,
        MODEL_ENV,
        BASE_URL_ENV,
        "XDG_CONFIG_HOME",
    ];

    /// Clear every variable `resolve` reads and point the config directory
    /// at `dir`.
    fn isolate(dir: &std::path::Path) {
        for var in ALL_VARS {
            unsafe { std::env::remove_var(var) };
        }
        unsafe { std::env::set_var("XDG_CONFIG_HOME", dir) };
    }

    fn write_file(contents: &str) {
        std::fs::create_dir_all(config_dir()).unwrap();
        std::fs::write(config_path(), contents).unwrap();
    }

    #[test]
    fn defaults_when_nothing_set() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        isolate(tmp.path());

        let config = RationConfig::resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.generation, GenerationConfig::default());
        assert_eq!(config.enrichment_workers, 3);
        assert_eq!(config.db_config.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.plan_ttl, DEFAULT_PLAN_TTL);
        assert_eq!(config.recipe_ttl, DEFAULT_RECIPE_TTL);

        let err = config.api_key().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV), "unexpected error: {err}");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        isolate(tmp.path());
        write_file(
            r#"
[database]
url = "postgresql://file:5432/filedb"

[generation]
model = "file-model"
max_attempts = 5
timeout_secs = 30

[enrichment]
workers = 6

[cache]
plan_ttl_secs = 60
"#,
        );

        let config = RationConfig::resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
        assert_eq!(config.generation.model, "file-model");
        assert_eq!(config.generation.max_attempts, 5);
        assert_eq!(config.generation.request_timeout, Duration::from_secs(30));
        assert_eq!(config.enrichment_workers, 6);
        assert_eq!(config.db_config.max_connections, 8);
        assert_eq!(config.plan_ttl, Duration::from_secs(60));
        assert_eq!(config.recipe_ttl, DEFAULT_RECIPE_TTL);
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        isolate(tmp.path());
        write_file("[database]\nurl = \"postgresql://file:5432/filedb\"\n[generation]\nmodel = \"file-model\"\n");
        unsafe { std::env::set_var("RATION_DATABASE_URL", "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(MODEL_ENV, "env-model") };

        let config = RationConfig::resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.generation.model, "env-model");

        let cli = CliOverrides {
            database_url: Some("postgresql://cli:5432/clidb".into()),
            base_url: Some("http://localhost:8080/v1".into()),
            model: Some("cli-model".into()),
        };
        let config = RationConfig::resolve(&cli).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.generation.model, "cli-model");

        isolate(tmp.path());
    }

    #[test]
    fn api_key_falls_back_to_openai_variable() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        isolate(tmp.path());

        unsafe { std::env::set_var(FALLBACK_API_KEY_ENV, "sk-fallback") };
        let config = RationConfig::resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.api_key().unwrap(), "sk-fallback");

        unsafe { std::env::set_var(API_KEY_ENV, "sk-primary") };
        let config = RationConfig::resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.api_key().unwrap(), "sk-primary");

        isolate(tmp.path());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        isolate(tmp.path());
        write_file("[database]\nurl = \"postgresql://file:5432/filedb\"\n[enrichment]\nworkers = 0\n");

        let err = RationConfig::resolve(&CliOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("enrichment.workers"));
    }

    #[cfg(unix)]
    #[test]
    fn save_config_round_trips_with_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        isolate(tmp.path());

        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_owned(),
            },
            enrichment: EnrichmentSection { workers: Some(4) },
            ..Default::default()
        };
        let path = save_config(&original).unwrap();
        assert!(path.ends_with("ration/config.toml"));

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(loaded.enrichment.workers, Some(4));
        assert_eq!(loaded.generation.model, None);
    }
}
