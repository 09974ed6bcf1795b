use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::debug;

use crate::{
    Repository,
    provider::{
        openweather::{DEFAULT_BASE_URL, DEFAULT_DAYS},
        source_from_config,
    },
    store::sqlite::SqliteStore,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_CITY: &str = "Seattle";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// api_key = "..."
/// default_city = "Seattle"
/// days = 7
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Used when a request names no city.
    pub default_city: String,
    /// Number of daily entries to request.
    pub days: u8,
    pub timeout_secs: u64,
    /// Defaults to `forecast.sqlite3` in the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_city: DEFAULT_CITY.to_string(),
            days: DEFAULT_DAYS,
            timeout_secs: 10,
            database_path: None,
        }
    }
}

impl Config {
    /// API key from the environment, falling back to the stored one.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            return Ok(key);
        }

        self.api_key.clone().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `forecast configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// `city` trimmed, or the default city when it is blank.
    pub fn city_or_default<'a>(&'a self, city: Option<&'a str>) -> &'a str {
        match city.map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => self.default_city.as_str(),
        }
    }

    /// Load the config file from the platform config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Read `path`; a missing file means first run, so defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Write `path` as pretty TOML, creating its directory first.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("forecast.sqlite3")),
        }
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "forecast", "forecast-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}

/// Wire the OpenWeather source and the SQLite store into a repository.
pub async fn repository_from_config(config: &Config) -> Result<Repository> {
    let source = source_from_config(config);

    let path = config.database_path()?;
    let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    Ok(Repository::new(Arc::new(source), Arc::new(store), config.timeout()))
}
