//! Per-connection model discovery: declarative files in the model folder plus catalog factories.

use crate::connection::Connection;
use crate::error::ModelError;
use crate::model::factory::{ModelCatalog, ModelFactory};
use crate::model::declarative::{DeclarativeModel, ModelSpec};
use crate::model::types::{ModelDefinition, TypeRegistry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MODEL_FILE_EXT: &str = "json";
pub const INDEX_FILE: &str = "index.json";
pub const TEST_FILE_SUFFIX: &str = ".test.json";

/// A model definition together with the factory that produced it.
pub struct LoadedModel {
    pub factory: Arc<dyn ModelFactory>,
    pub definition: ModelDefinition,
}

/// Model files are `*.json`, excluding the folder index, test fixtures and hidden files.
pub fn is_model_file(file_name: &str) -> bool {
    !file_name.starts_with('.')
        && file_name != INDEX_FILE
        && !file_name.ends_with(TEST_FILE_SUFFIX)
        && Path::new(file_name)
            .extension()
            .map(|ext| ext == MODEL_FILE_EXT)
            .unwrap_or(false)
}

/// Non-recursive scan of `dir`. A missing folder yields no files.
pub async fn discover_model_files(dir: &Path) -> Result<Vec<PathBuf>, ModelError> {
    let io_err = |e: std::io::Error| ModelError::File {
        path: dir.to_path_buf(),
        message: e.to_string(),
    };
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "model folder missing, no file models loaded");
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_err(e)),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        if !entry.file_type().await.map_err(io_err)?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().map(is_model_file).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

pub async fn read_model_file(path: &Path) -> Result<ModelSpec, ModelError> {
    let file_err = |message: String| ModelError::File {
        path: path.to_path_buf(),
        message,
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| file_err(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| file_err(e.to_string()))
}

/// Invoke every factory for `connection` and collect the definitions. Returns only once all
/// models have loaded; names must be unique within the connection.
pub async fn load_models(
    connection: &Connection,
    model_dir: &Path,
    catalog: &ModelCatalog,
) -> Result<Vec<LoadedModel>, ModelError> {
    let mut factories: Vec<Arc<dyn ModelFactory>> = Vec::new();
    for path in discover_model_files(model_dir).await? {
        let spec = read_model_file(&path).await?;
        factories.push(Arc::new(DeclarativeModel::new(spec)));
    }
    factories.extend(catalog.factories(connection.key()).iter().cloned());

    let types = TypeRegistry::for_dialect(connection.dialect());
    let mut names = HashSet::new();
    let mut loaded = Vec::with_capacity(factories.len());
    for factory in factories {
        let definition = factory.define(connection, &types)?;
        if !names.insert(definition.name.clone()) {
            return Err(ModelError::DuplicateModel {
                connection: connection.key().to_string(),
                model: definition.name,
            });
        }
        tracing::debug!(db = %connection.key(), model = %definition.name, "model loaded");
        loaded.push(LoadedModel { factory, definition });
    }
    Ok(loaded)
}
