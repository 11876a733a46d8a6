//! Connection factory: one connection per descriptor (primary first, then registry order), each
//! with its models loaded and associations wired. A database whose config, models or associations
//! cannot be loaded is reported unavailable; the others are unaffected.

use crate::config::{load_connection_config, EnvLookup, Environment};
use crate::connection::Connection;
use crate::driver::PoolSettings;
use crate::error::AppError;
use crate::layout::ProjectLayout;
use crate::model::{load_models, wire_associations, ModelCatalog};
use crate::registry::{DatabaseDescriptor, Registry};
use tracing::Instrument;

#[derive(Clone, Debug, Default)]
pub struct BootstrapOptions {
    pub environment: Environment,
    pub pool: PoolSettings,
}

/// A database that could not be brought to the initialization stage.
#[derive(Debug)]
pub struct Unavailable {
    pub key: String,
    pub error: AppError,
}

/// Connections in startup order, plus the databases that failed before initialization.
#[derive(Debug, Default)]
pub struct Databases {
    /// Every key in startup order, available or not.
    order: Vec<String>,
    connections: Vec<Connection>,
    unavailable: Vec<Unavailable>,
}

impl Databases {
    pub fn get(&self, key: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.key() == key)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut [Connection] {
        &mut self.connections
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.connections.iter().map(|c| c.key())
    }

    pub fn unavailable(&self) -> &[Unavailable] {
        &self.unavailable
    }

    /// Keys of connected and unavailable databases, primary first, then registry order.
    pub fn startup_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn unavailable_entry(&self, key: &str) -> Option<&Unavailable> {
        self.unavailable.iter().find(|u| u.key == key)
    }

    pub async fn close_all(&self) {
        for conn in &self.connections {
            conn.close().await;
        }
    }
}

async fn open_database(
    layout: &ProjectLayout,
    descriptor: &DatabaseDescriptor,
    catalog: &ModelCatalog,
    env: &dyn EnvLookup,
    options: &BootstrapOptions,
) -> Result<Connection, AppError> {
    let config = load_connection_config(&layout.config_path(descriptor), options.environment, env).await?;
    let mut conn = Connection::open(&descriptor.key, &config, &options.pool)?;
    let loaded = load_models(&conn, &layout.model_dir(descriptor), catalog).await?;
    let models = wire_associations(conn.key(), loaded)?;
    tracing::info!(dialect = %conn.dialect(), models = models.len(), "connection created");
    conn.bind_models(models);
    Ok(conn)
}

/// Build connections for the primary database and every registry entry.
pub async fn bootstrap(
    layout: &ProjectLayout,
    registry: &Registry,
    catalog: &ModelCatalog,
    env: &dyn EnvLookup,
    options: &BootstrapOptions,
) -> Databases {
    let mut databases = Databases::default();
    for descriptor in registry.startup_order() {
        databases.order.push(descriptor.key.clone());
        let span = tracing::info_span!("bootstrap", db = %descriptor.key);
        match open_database(layout, &descriptor, catalog, env, options)
            .instrument(span)
            .await
        {
            Ok(conn) => databases.connections.push(conn),
            Err(error) => {
                tracing::error!(db = %descriptor.key, error = %error, "database unavailable");
                databases.unavailable.push(Unavailable {
                    key: descriptor.key,
                    error,
                });
            }
        }
    }
    databases
}
