//! Process-wide settings, read from the environment via figment.
//!
//! `dotenvy` is expected to have run before [`Config::load`] so that values
//! from a local `.env` file are visible here.

use std::time::Duration;

use figment::{Figment, providers::Env};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::db::pool::PoolSettings;
use crate::error::LedgerError;

const KEYS: &[&str] = &[
    "DB_ENGINE",
    "DB_NAME",
    "DB_POOL_MIN",
    "DB_POOL_MAX",
    "DB_ACQUIRE_TIMEOUT_SECS",
    "DB_BULK_PAGE_SIZE",
    "DB_INIT_SCHEMA",
    "LOCAL_API_HOST",
    "LISTEN_ADDR",
    "LOGLEVEL",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub db_engine: String,
    pub db_name: String,
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_bulk_page_size: usize,
    pub db_init_schema: bool,
    pub local_api_host: String,
    pub listen_addr: String,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_engine: "mysql".to_string(),
            db_name: "local".to_string(),
            db_pool_min: 2,
            db_pool_max: 10,
            db_acquire_timeout_secs: 30,
            db_bulk_page_size: 300,
            db_init_schema: true,
            local_api_host: "http://127.0.0.1:8000".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn load() -> Result<Self, LedgerError> {
        Self::from_figment(Figment::new().merge(Env::raw().only(KEYS)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, LedgerError> {
        let cfg: Config = figment.extract()?;
        cfg.pool_settings()?;
        cfg.api_base_url()?;
        Ok(cfg)
    }

    pub fn api_base_url(&self) -> Result<Url, LedgerError> {
        Ok(Url::parse(&self.local_api_host)?)
    }

    /// Validated pool bounds for the data access layer.
    pub fn pool_settings(&self) -> Result<PoolSettings, LedgerError> {
        PoolSettings::new(
            self.db_pool_min,
            self.db_pool_max,
            Duration::from_secs(self.db_acquire_timeout_secs),
            self.db_bulk_page_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load().expect("defaults load");
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.api_base_url().unwrap().as_str(), "http://127.0.0.1:8000/");
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("DB_ENGINE", "postgres");
            jail.set_env("DB_POOL_MIN", "1");
            jail.set_env("DB_POOL_MAX", "4");
            jail.set_env("DB_INIT_SCHEMA", "false");
            jail.set_env("LOCAL_API_HOST", "http://api.internal:9000");

            let cfg = Config::load().expect("config loads");
            assert_eq!(cfg.db_engine, "postgres");
            assert_eq!(cfg.db_pool_min, 1);
            assert_eq!(cfg.db_pool_max, 4);
            assert!(!cfg.db_init_schema);
            assert_eq!(cfg.api_base_url().unwrap().host_str(), Some("api.internal"));
            Ok(())
        });
    }

    #[test]
    fn inverted_pool_bounds_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("DB_POOL_MIN", "8");
            jail.set_env("DB_POOL_MAX", "2");

            let err = Config::load().unwrap_err();
            assert!(matches!(err, LedgerError::InvalidConfig(_)), "{err}");
            Ok(())
        });
    }

    #[test]
    fn malformed_api_host_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("LOCAL_API_HOST", "not a url");

            let err = Config::load().unwrap_err();
            assert!(matches!(err, LedgerError::UrlParse(_)), "{err}");
            Ok(())
        });
    }

    #[test]
    fn non_numeric_pool_size_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("DB_POOL_MAX", "lots");

            let err = Config::load().unwrap_err();
            assert!(matches!(err, LedgerError::Config(_)), "{err}");
            Ok(())
        });
    }
}
