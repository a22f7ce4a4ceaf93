use crate::consts::MAX_AGGREGATION_LIMIT;
use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
    pub retention: Option<usize>,
}

/// Settings for the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Page size used when a caller asks for none, and the cap applied when one asks for more.
    pub max_aggregation_limit: usize,
    /// Directory of extra `*.json` aggregation templates.
    pub templates_dir: Option<PathBuf>,
    pub log: LogConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_aggregation_limit: MAX_AGGREGATION_LIMIT, templates_dir: None, log: LogConfig::default() }
    }
}

impl StoreConfig {
    /// Loads the configuration.
    ///
    /// Precedence: env > config file > defaults. The file is the first that exists of
    /// `path`, `$CONFIGDB_CONFIG`, `./configdb.toml`.
    ///
    /// # Errors
    /// Returns an error when a config file cannot be read or parsed, or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, DbError> {
        Self::load_with(path, |k| std::env::var(k).ok())
    }

    /// Same as [`StoreConfig::load`] with an explicit environment lookup.
    ///
    /// # Errors
    /// See [`StoreConfig::load`].
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DbError> {
        let mut paths: Vec<PathBuf> = Vec::new();
        if let Some(p) = path {
            paths.push(p.to_path_buf());
        }
        if let Some(p) = env("CONFIGDB_CONFIG") {
            paths.push(PathBuf::from(p));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join("configdb.toml"));
        }
        let mut cfg = match paths.iter().find(|p| p.exists()) {
            Some(p) => {
                log::debug!("loading config from {}", p.display());
                Self::from_toml_str(&std::fs::read_to_string(p)?)?
            }
            None => Self::default(),
        };

        if let Some(s) = env("CONFIGDB_MAX_AGGREGATION_LIMIT") {
            cfg.max_aggregation_limit = s.trim().parse().map_err(|_| {
                DbError::Config(format!("CONFIGDB_MAX_AGGREGATION_LIMIT is not a number: {s}"))
            })?;
        }
        if let Some(s) = env("CONFIGDB_TEMPLATES_DIR") {
            cfg.templates_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = env("CONFIGDB_LOG_DIR") {
            cfg.log.dir = Some(PathBuf::from(s));
        }
        if let Some(s) = env("CONFIGDB_LOG_LEVEL") {
            cfg.log.level = Some(s);
        }
        if let Some(n) = env("CONFIGDB_LOG_RETENTION").and_then(|s| s.parse().ok()) {
            cfg.log.retention = Some(n);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error on malformed TOML or invalid values.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// `DbError::Config` when `max_aggregation_limit` is zero.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.max_aggregation_limit == 0 {
            return Err(DbError::Config("max_aggregation_limit must be greater than zero".into()));
        }
        Ok(())
    }
}
