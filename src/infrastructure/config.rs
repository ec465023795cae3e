use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::errors::MonitorError;
use crate::domain::value_objects::{ColumnName, MonitoredTable, Schema, TableName};

/// Prefix of environment variables that override the config file, e.g.
/// `TABLEWATCH__DATABASE__PASSWORD`.
pub const ENV_PREFIX: &str = "TABLEWATCH";

/// Longest accepted polling interval: one leap year.
pub const MAX_INTERVAL_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Only needed by commands that talk to the database.
    #[serde(default)]
    pub database: DbConfig,
    pub table: TableConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// Database driver: "postgres" (default), "mysql", "mariadb", or "sqlite".
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub host: String,
    /// Falls back to the driver's standard port.
    pub port: Option<u16>,
    #[serde(default)]
    pub dbname: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub schema: String,
}

fn default_driver() -> String {
    "postgres".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TableConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_value_column() -> String {
    "name".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Latest snapshot, JSON. Read by dashboards.
    pub state_file: Option<PathBuf>,
    /// Attempt/success bookkeeping, JSON.
    pub status_file: Option<PathBuf>,
    /// Append-only event log.
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_retry_backoff_secs() -> u64 {
    60
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            status_file: None,
            log_file: None,
            interval_secs: default_interval_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: String::new(),
            port: None,
            dbname: String::new(),
            user: String::new(),
            password: String::new(),
            schema: String::new(),
        }
    }
}

impl DbConfig {
    /// Build a sqlx-compatible connection URL from this config.
    pub fn url(&self) -> String {
        match self.driver.as_str() {
            "mysql" | "mariadb" => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user,
                self.password,
                self.host,
                self.port.unwrap_or(3306),
                self.dbname
            ),
            "sqlite" => format!("sqlite://{}", self.dbname),
            _ => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user,
                self.password,
                self.host,
                self.port.unwrap_or(5432),
                self.dbname
            ),
        }
    }

    fn validate(&self) -> Result<(), MonitorError> {
        let required: Vec<(&str, &str)> = match self.driver.as_str() {
            "sqlite" => vec![("dbname", self.dbname.as_str())],
            "postgres" | "mysql" | "mariadb" => vec![
                ("host", self.host.as_str()),
                ("dbname", self.dbname.as_str()),
                ("user", self.user.as_str()),
            ],
            other => {
                return Err(MonitorError::Configuration(format!(
                    "unsupported database driver '{other}'"
                )))
            }
        };

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::Configuration(format!(
                "missing database parameter(s): {}",
                missing.join(", ")
            )))
        }
    }
}

impl MonitorConfig {
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| default_data_dir().join("monitor_state.json"))
    }

    pub fn status_path(&self) -> PathBuf {
        self.status_file
            .clone()
            .unwrap_or_else(|| default_data_dir().join("monitor_status.json"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| default_data_dir().join("table_monitor.log"))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tablewatch")
}

impl AppConfig {
    /// Load `path` (optional, TOML) and apply `TABLEWATCH__*` overrides.
    ///
    /// Connection parameters are not checked here so read-only commands work
    /// without credentials; [`AppConfig::validate`] checks everything.
    pub fn load(path: &str) -> Result<Self, MonitorError> {
        let builder = Config::builder()
            .add_source(File::from(Path::new(path)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// Parse a TOML document with no environment overrides.
    pub fn from_toml(content: &str) -> Result<Self, MonitorError> {
        Self::build(Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, MonitorError> {
        let cfg: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MonitorError::Configuration(e.to_string()))?;
        cfg.validate_monitoring()?;
        Ok(cfg)
    }

    /// Full validation, required before connecting to the database.
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.database.validate()?;
        self.validate_monitoring()
    }

    /// Table and polling settings only.
    pub fn validate_monitoring(&self) -> Result<(), MonitorError> {
        if self.table.name.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "table.name is required".to_string(),
            ));
        }
        if self.table.id_column.trim().is_empty() || self.table.value_column.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "table.id_column and table.value_column must not be empty".to_string(),
            ));
        }
        if self.monitor.interval_secs == 0 {
            return Err(MonitorError::Configuration(
                "monitor.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.monitor.interval_secs > MAX_INTERVAL_SECS {
            return Err(MonitorError::Configuration(format!(
                "monitor.interval_secs must be at most {MAX_INTERVAL_SECS}"
            )));
        }
        if self.monitor.retry_backoff_secs == 0 {
            return Err(MonitorError::Configuration(
                "monitor.retry_backoff_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn monitored_table(&self) -> MonitoredTable {
        MonitoredTable {
            schema: Schema(self.database.schema.clone()),
            table: TableName(self.table.name.clone()),
            id_column: ColumnName(self.table.id_column.clone()),
            value_column: ColumnName(self.table.value_column.clone()),
        }
    }
}
