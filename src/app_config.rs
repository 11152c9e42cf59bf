use std::path::Path;

use ::config::{Config, Environment, File};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use crate::money::PayoutTable;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub ledger: LedgerSettings,
    pub auth: AuthSettings,
    pub money_management: PayoutTable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "data/journal.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Starting balance used while no settings row exists.
    pub default_initial_budget: f64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_initial_budget: 700.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub session_ttl_hours: i64,
    pub allow_registration: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl_hours: 168,
            allow_registration: true,
        }
    }
}

/// Layered load: compiled defaults, `config/default.toml`,
/// `config/{JOURNAL_ENV}.toml`, then `JOURNAL__SECTION__KEY` variables.
pub fn load_config() -> Result<AppConfig> {
    let environment = std::env::var("JOURNAL_ENV").unwrap_or_else(|_| "development".into());
    load_from(Path::new("config"), &environment)
}

pub fn load_from(dir: &Path, environment: &str) -> Result<AppConfig> {
    let settings = Config::builder()
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(environment)).required(false))
        .add_source(
            Environment::with_prefix("JOURNAL")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    pub fn log_filter(&self) -> LevelFilter {
        self.app.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.app.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.app.log_level
            )));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid("database.path is empty".to_string()));
        }
        let budget = self.ledger.default_initial_budget;
        if !budget.is_finite() || budget < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "ledger.default_initial_budget must be a non-negative number, got {}",
                budget
            )));
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "auth.session_ttl_hours must be positive".to_string(),
            ));
        }

        let table = &self.money_management;
        let payouts = std::iter::once(table.default_payout).chain(table.payouts.iter().map(|p| p.payout));
        for payout in payouts {
            if !payout.is_finite() || payout <= 0.0 || payout > 100.0 {
                return Err(ConfigError::Invalid(format!("payout {} is out of range", payout)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = load_from(dir.path(), "nothing-here").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ledger.default_initial_budget, 700.0);
        assert_eq!(config.auth.session_ttl_hours, 168);
        assert!(config.auth.allow_registration);
        assert_eq!(config.money_management.payout_for("Gruppo Elite Pro"), Some(0.86));
        assert_eq!(config.log_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_environment_file_overrides_default_file() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            r#"
[server]
host = "0.0.0.0"
port = 3000

[ledger]
default_initial_budget = 1000.0
"#,
        );
        write(
            &dir,
            "staging.toml",
            r#"
[server]
port = 3100

[auth]
allow_registration = false

[money_management]
default_payout = 0.75
payouts = [{ group = "Gruppo Live", payout = 0.9 }]
"#,
        );

        let config = load_from(dir.path(), "staging").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3100");
        assert_eq!(config.ledger.default_initial_budget, 1000.0);
        assert!(!config.auth.allow_registration);
        assert_eq!(config.money_management.default_payout, 0.75);
        assert_eq!(config.money_management.payout_for("Gruppo Live"), Some(0.9));
        assert_eq!(config.money_management.payout_for("Bot"), None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[ledger]\ndefault_initial_budget = -5.0\n");
        assert!(matches!(load_from(dir.path(), "x"), Err(ConfigError::Invalid(_))));

        write(&dir, "default.toml", "[app]\nlog_level = \"chatty\"\n");
        assert!(matches!(load_from(dir.path(), "x"), Err(ConfigError::Invalid(_))));
    }
}
