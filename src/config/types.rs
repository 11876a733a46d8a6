//! Connection settings and the on-disk config artifact (`DB/<KEY>.config.json`).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relational database family. `mariadb` speaks the MySQL wire protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mysql,
    Mariadb,
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Mariadb => "mariadb",
            Dialect::Postgres => "postgres",
        }
    }

    /// Cargo feature that compiles the sqlx driver for this dialect.
    pub fn driver_feature(&self) -> &'static str {
        match self {
            Dialect::Mysql | Dialect::Mariadb => "mysql",
            Dialect::Postgres => "postgres",
        }
    }

    pub fn driver_available(&self) -> bool {
        match self {
            Dialect::Mysql | Dialect::Mariadb => cfg!(feature = "mysql"),
            Dialect::Postgres => cfg!(feature = "postgres"),
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::Mysql | Dialect::Mariadb => 3306,
            Dialect::Postgres => 5432,
        }
    }

    pub fn default_username(&self) -> &'static str {
        match self {
            Dialect::Mysql | Dialect::Mariadb => "root",
            Dialect::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Dialect::Mysql),
            "mariadb" => Ok(Dialect::Mariadb),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(ConfigError::UnknownDialect(s.to_string())),
        }
    }
}

/// Deployment environment selecting one block of the config artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Resolved settings for one database in one environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub username: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub dialect: Dialect,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dialect", &self.dialect)
            .finish()
    }
}

/// Environment variable names carrying overrides for one database key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvVarNames {
    pub user: String,
    pub password: String,
    pub name: String,
    pub host: String,
    pub port: String,
}

impl EnvVarNames {
    pub fn for_key(key: &str) -> Self {
        EnvVarNames {
            user: format!("{}_USER", key),
            password: format!("{}_PASSWORD", key),
            name: format!("{}_NAME", key),
            host: format!("{}_HOST", key),
            port: format!("{}_PORT", key),
        }
    }
}

/// Field read from `env` when set and non-empty, otherwise from the literal `default`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackField<T> {
    pub env: String,
    pub default: T,
}

/// Field read from `env` only. A literal alongside it is rejected when parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvField {
    pub env: String,
}

/// Development/test block: zero-setup local runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackBlock {
    pub username: FallbackField<String>,
    pub password: FallbackField<String>,
    pub database: FallbackField<String>,
    pub host: FallbackField<String>,
    pub port: FallbackField<u16>,
    pub dialect: Dialect,
}

/// Production block: no embedded secrets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvOnlyBlock {
    pub username: EnvField,
    pub password: EnvField,
    pub database: EnvField,
    pub host: EnvField,
    pub port: EnvField,
    pub dialect: Dialect,
}

/// Whole config artifact for one database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub development: FallbackBlock,
    pub test: FallbackBlock,
    pub production: EnvOnlyBlock,
}
