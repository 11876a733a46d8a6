//! Registration-time flows: initialize a project's database scaffolding and add a database.
//! Adding a database validates everything and runs the connectivity precheck before the first
//! write; a failure part-way through the writes restores the previous state.

use crate::config::{generate, validate_credentials, validate_key, validate_table_name, ConnectionConfig, Dialect};
use crate::env_file::append_env_block;
use crate::error::{AppError, RegistryError};
use crate::layout::{path_exists, ProjectLayout};
use crate::model::{AttributeSpec, ModelSpec, TypeRegistry};
use crate::precheck::ConnectivityProbe;
use crate::registry::{DatabaseDescriptor, Registry};
use crate::store::{check_registration, load_registry, register_database, save_registry, write_new};
use std::path::{Path, PathBuf};

/// Request to add one database.
#[derive(Clone, Debug)]
pub struct NewDatabase {
    pub key: String,
    pub credentials: ConnectionConfig,
    /// Table for the starter model file.
    pub table: String,
    pub attributes: Vec<AttributeSpec>,
}

#[derive(Clone, Debug)]
pub struct AddedDatabase {
    pub descriptor: DatabaseDescriptor,
    pub config_path: PathBuf,
    pub model_path: PathBuf,
    pub env_updated: bool,
}

/// Local-development credentials for the primary database.
pub fn default_credentials(dialect: Dialect, database: &str) -> ConnectionConfig {
    ConnectionConfig {
        username: dialect.default_username().to_string(),
        password: String::new(),
        database: database.to_string(),
        host: "localhost".to_string(),
        port: dialect.default_port(),
        dialect,
    }
}

fn json_text<T: serde::Serialize>(path: &Path, value: &T) -> Result<String, RegistryError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|source| RegistryError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');
    Ok(text)
}

fn validate_request(request: &NewDatabase) -> Result<(), AppError> {
    validate_key(&request.key)?;
    validate_table_name(&request.table)?;
    validate_credentials(&request.credentials)?;
    for attr in &request.attributes {
        validate_table_name(&attr.name)?;
    }
    Ok(())
}

/// Starter model, checked the way startup will load it.
fn starter_model(request: &NewDatabase) -> Result<ModelSpec, AppError> {
    let spec = ModelSpec::sample(&request.table, request.attributes.clone());
    let types = TypeRegistry::for_dialect(request.credentials.dialect);
    spec.definition(&request.key, &types)?;
    Ok(spec)
}

async fn rollback(layout: &ProjectLayout, previous: &Registry, config_path: &Path, model_dir: &Path) {
    if let Err(e) = save_registry(layout, previous).await {
        tracing::error!(error = %e, "rollback: could not restore registry");
    }
    if let Err(e) = tokio::fs::remove_file(config_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::error!(path = %config_path.display(), error = %e, "rollback: could not remove config");
        }
    }
    if let Err(e) = tokio::fs::remove_dir_all(model_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::error!(path = %model_dir.display(), error = %e, "rollback: could not remove model folder");
        }
    }
}

/// Add a database to the project: registry entry, config artifact, starter model, `.env` block.
/// Nothing is written unless every precondition holds and the precheck succeeds.
pub async fn add_database(
    layout: &ProjectLayout,
    request: &NewDatabase,
    probe: &dyn ConnectivityProbe,
) -> Result<AddedDatabase, AppError> {
    layout.ensure_project().await?;
    validate_request(request)?;
    let starter = starter_model(request)?;

    let descriptor = DatabaseDescriptor::for_key(&request.key);
    let registry = load_registry(layout).await?;
    check_registration(layout, &registry, &descriptor).await?;
    let config_path = layout.config_path(&descriptor);
    if path_exists(&config_path).await? {
        return Err(RegistryError::PathConflict(config_path).into());
    }

    let config_text = generate(&descriptor, &request.credentials).map_err(|source| RegistryError::Json {
        path: config_path.clone(),
        source,
    })?;
    let model_dir = layout.model_dir(&descriptor);
    let model_path = model_dir.join(format!("{}.json", request.table));
    let model_text = json_text(&model_path, &starter)?;

    tracing::info!(db = %request.key, "testing connection");
    if !probe.test_connection(&request.key, &request.credentials).await? {
        tracing::error!(db = %request.key, "connection failed, database not added");
        return Err(AppError::ConnectivityFailed(request.key.clone()));
    }

    register_database(layout, descriptor.clone()).await?;
    let writes = async {
        write_new(&config_path, &config_text).await?;
        write_new(&model_path, &model_text).await?;
        append_env_block(&layout.env_path(), &request.key, &request.credentials).await
    };
    let env_updated = match writes.await {
        Ok(updated) => updated,
        Err(e) => {
            tracing::error!(db = %request.key, error = %e, "write failed, rolling back");
            rollback(layout, &registry, &config_path, &model_dir).await;
            return Err(e.into());
        }
    };

    tracing::info!(db = %request.key, config = %config_path.display(), "database added");
    Ok(AddedDatabase {
        descriptor,
        config_path,
        model_path,
        env_updated,
    })
}

/// Create `DB/`, `Models/MAIN_DB/`, the primary config, an empty registry and the primary `.env`
/// block. Existing artifacts are kept. Returns the paths created.
pub async fn init_project(
    layout: &ProjectLayout,
    credentials: &ConnectionConfig,
) -> Result<Vec<PathBuf>, AppError> {
    validate_credentials(credentials)?;
    let primary = DatabaseDescriptor::primary();
    let mut created = Vec::new();

    for dir in [layout.db_dir(), layout.model_dir(&primary)] {
        if !path_exists(&dir).await? {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| RegistryError::Io {
                    path: dir.clone(),
                    source,
                })?;
            created.push(dir);
        }
    }

    let config_path = layout.config_path(&primary);
    if !path_exists(&config_path).await? {
        let text = generate(&primary, credentials).map_err(|source| RegistryError::Json {
            path: config_path.clone(),
            source,
        })?;
        write_new(&config_path, &text).await?;
        created.push(config_path);
    }

    let registry_path = layout.registry_path();
    if !path_exists(&registry_path).await? {
        save_registry(layout, &Registry::new()).await?;
        created.push(registry_path);
    }

    if append_env_block(&layout.env_path(), &primary.key, credentials).await? {
        created.push(layout.env_path());
    }
    tracing::info!(root = %layout.root().display(), dialect = %credentials.dialect, "main database configured");
    Ok(created)
}
