//! Dialect-specific sqlx drivers. Each dialect's driver is compiled in through a cargo feature;
//! a dialect whose feature is off is reported as `DriverMissing` rather than a connection failure.

use crate::config::{ConnectionConfig, Dialect};
use crate::error::DriverError;
use std::time::Duration;

#[cfg(not(any(feature = "postgres", feature = "mysql")))]
compile_error!("enable at least one of the `postgres` or `mysql` features");

/// Pool sizing for startup connections.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Upper bound for one authenticate attempt to obtain a connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

pub fn ensure_driver(dialect: Dialect) -> Result<(), DriverError> {
    if dialect.driver_available() {
        Ok(())
    } else {
        Err(DriverError::DriverMissing {
            dialect: dialect.as_str(),
            feature: dialect.driver_feature(),
        })
    }
}

#[cfg(feature = "postgres")]
fn pg_options(config: &ConnectionConfig) -> sqlx::postgres::PgConnectOptions {
    sqlx::postgres::PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database)
}

#[cfg(feature = "mysql")]
fn mysql_options(config: &ConnectionConfig) -> sqlx::mysql::MySqlConnectOptions {
    sqlx::mysql::MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database)
}

/// Lazily-connected pool for one database. No network I/O happens until first use.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "postgres")]
    Postgres(sqlx::PgPool),
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlPool),
}

impl DbPool {
    /// Must be called within a tokio runtime.
    pub fn connect_lazy(config: &ConnectionConfig, settings: &PoolSettings) -> Result<Self, DriverError> {
        ensure_driver(config.dialect)?;
        match config.dialect {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => Ok(DbPool::Postgres(
                sqlx::postgres::PgPoolOptions::new()
                    .max_connections(settings.max_connections)
                    .acquire_timeout(settings.acquire_timeout)
                    .connect_lazy_with(pg_options(config)),
            )),
            #[cfg(feature = "mysql")]
            Dialect::Mysql | Dialect::Mariadb => Ok(DbPool::MySql(
                sqlx::mysql::MySqlPoolOptions::new()
                    .max_connections(settings.max_connections)
                    .acquire_timeout(settings.acquire_timeout)
                    .connect_lazy_with(mysql_options(config)),
            )),
            #[allow(unreachable_patterns)]
            other => Err(DriverError::DriverMissing {
                dialect: other.as_str(),
                feature: other.driver_feature(),
            }),
        }
    }

    /// Authenticate: obtain a connection and run a trivial statement.
    pub async fn ping(&self) -> Result<(), DriverError> {
        self.execute("SELECT 1").await
    }

    pub async fn execute(&self, sql: &str) -> Result<(), DriverError> {
        tracing::debug!(sql = %sql, "query");
        match self {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        match self {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.close().await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => pool.close().await,
        }
    }
}

/// One authenticate-then-close round trip on a dedicated connection, bounded by `timeout`.
pub async fn probe(config: &ConnectionConfig, timeout: Duration) -> Result<(), DriverError> {
    ensure_driver(config.dialect)?;
    let round_trip = async {
        use sqlx::{ConnectOptions, Connection};
        match config.dialect {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => {
                let mut conn = pg_options(config).connect().await?;
                conn.ping().await?;
                conn.close().await?;
            }
            #[cfg(feature = "mysql")]
            Dialect::Mysql | Dialect::Mariadb => {
                let mut conn = mysql_options(config).connect().await?;
                conn.ping().await?;
                conn.close().await?;
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(DriverError::DriverMissing {
                    dialect: other.as_str(),
                    feature: other.driver_feature(),
                })
            }
        }
        Ok::<(), DriverError>(())
    };
    tokio::time::timeout(timeout, round_trip)
        .await
        .map_err(|_| DriverError::Timeout(timeout))?
}
