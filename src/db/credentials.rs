use std::fmt;

use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;

use crate::db::Engine;
use crate::error::LedgerError;

/// Connection parameters for one engine/database pair.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DbCredentials {
    /// Resolve `{ENGINE}_{DBNAME}_{FIELD}` variables from the process environment.
    pub fn from_env(engine: Engine, db_name: &str) -> Result<Self, LedgerError> {
        Self::resolve_with(engine, db_name, |key| std::env::var(key).ok())
    }

    /// Resolve credentials through an arbitrary lookup. Every missing key is
    /// reported at once.
    pub fn resolve_with<F>(engine: Engine, db_name: &str, lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = format!("{}_{}", engine.env_prefix(), db_name.to_uppercase());
        let key = |field: &str| format!("{prefix}_{field}");

        let mut missing = Vec::new();
        let mut take = |field: &str| {
            let name = key(field);
            let value = lookup(&name);
            if value.is_none() {
                missing.push(name);
            }
            value
        };

        let host = take("HOST");
        let port = take("PORT");
        let database = take("DB");
        let user = take("USER");
        let password = take("PASSWORD");

        let (Some(host), Some(port), Some(database), Some(user), Some(password)) =
            (host, port, database, user, password)
        else {
            return Err(LedgerError::MissingCredentials {
                engine: engine.to_string(),
                db_name: db_name.to_string(),
                missing,
            });
        };

        let port = port.trim().parse::<u16>().map_err(|e| {
            LedgerError::InvalidConfig(format!("{} is not a valid port: {e}", key("PORT")))
        })?;

        Ok(Self {
            host,
            port,
            database,
            user,
            password,
        })
    }

    pub fn pg_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }

    pub fn mysql_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}
