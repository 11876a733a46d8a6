//! A live handle to one database and its bound models.

use crate::config::{ConnectionConfig, Dialect};
use crate::driver::{DbPool, PoolSettings};
use crate::error::DriverError;
use crate::init::ManagedConnection;
use crate::model::{ModelDefinition, ModelMap};
use crate::sync::create_table_sql;
use async_trait::async_trait;
use serde::Serialize;

/// Startup lifecycle of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Pending,
    Authenticating,
    Synced,
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Synced | ConnectionState::Failed)
    }

    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Pending, Authenticating)
                | (Authenticating, Authenticating)
                | (Authenticating, Synced)
                | (Authenticating, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Pending => "pending",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Synced => "synced",
            ConnectionState::Failed => "failed",
        }
    }
}

pub struct Connection {
    key: String,
    dialect: Dialect,
    pool: DbPool,
    models: ModelMap,
    state: ConnectionState,
}

impl Connection {
    /// Open a lazy pool for `config`. Nothing is sent over the network until initialization.
    pub fn open(key: &str, config: &ConnectionConfig, settings: &PoolSettings) -> Result<Self, DriverError> {
        let pool = DbPool::connect_lazy(config, settings)?;
        Ok(Connection {
            key: key.to_string(),
            dialect: config.dialect,
            pool,
            models: ModelMap::new(),
            state: ConnectionState::Pending,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn models(&self) -> &ModelMap {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn bind_models(&mut self, models: ModelMap) {
        self.models = models;
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("key", &self.key)
            .field("dialect", &self.dialect)
            .field("models", &self.models.len())
            .field("state", &self.state)
            .finish()
    }
}

#[async_trait]
impl ManagedConnection for Connection {
    fn key(&self) -> &str {
        &self.key
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    async fn authenticate(&self) -> Result<(), DriverError> {
        self.pool.ping().await
    }

    async fn sync(&self) -> Result<(), DriverError> {
        let mut names: Vec<&String> = self.models.keys().collect();
        names.sort();
        for name in names {
            if let Some(model) = self.models.get(name) {
                self.pool.execute(&create_table_sql(self.dialect, model)).await?;
            }
        }
        Ok(())
    }
}
