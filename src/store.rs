//! Registry persistence (`DB/registry.json`) and the registration-time mutator.
//! Writes go through a temp file and rename so a reader never sees a partial registry.

use crate::config::validate_key;
use crate::error::RegistryError;
use crate::layout::{path_exists, ProjectLayout};
use crate::registry::{DatabaseDescriptor, Registry};
use std::path::Path;

/// Load the registry. A missing file is an empty registry; stored entries are re-validated.
pub async fn load_registry(layout: &ProjectLayout) -> Result<Registry, RegistryError> {
    let path = layout.registry_path();
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Registry::new()),
        Err(source) => return Err(RegistryError::Io { path, source }),
    };
    if text.trim().is_empty() {
        return Ok(Registry::new());
    }
    let entries: Vec<DatabaseDescriptor> =
        serde_json::from_str(&text).map_err(|source| RegistryError::Json { path, source })?;
    Registry::from_entries(entries)
}

pub async fn save_registry(layout: &ProjectLayout, registry: &Registry) -> Result<(), RegistryError> {
    let path = layout.registry_path();
    let mut text = serde_json::to_string_pretty(registry).map_err(|source| RegistryError::Json {
        path: path.clone(),
        source,
    })?;
    text.push('\n');
    write_atomic(&path, &text).await
}

/// Preconditions for adding `descriptor`: valid key, no duplicate, no existing model folder.
/// Performs no writes.
pub async fn check_registration(
    layout: &ProjectLayout,
    registry: &Registry,
    descriptor: &DatabaseDescriptor,
) -> Result<(), RegistryError> {
    validate_key(&descriptor.key)?;
    if registry.contains_key(&descriptor.key) {
        return Err(RegistryError::DuplicateKey(descriptor.key.clone()));
    }
    let model_dir = layout.model_dir(descriptor);
    if path_exists(&model_dir).await? {
        return Err(RegistryError::PathConflict(model_dir));
    }
    Ok(())
}

/// Append `descriptor` to the persisted registry. On any precondition failure nothing is written.
/// Returns the registry as persisted.
pub async fn register_database(
    layout: &ProjectLayout,
    descriptor: DatabaseDescriptor,
) -> Result<Registry, RegistryError> {
    let mut registry = load_registry(layout).await?;
    check_registration(layout, &registry, &descriptor).await?;
    let key = descriptor.key.clone();
    registry.append(descriptor)?;
    save_registry(layout, &registry).await?;
    tracing::info!(db = %key, entries = registry.len(), "database registered");
    Ok(registry)
}

pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<(), RegistryError> {
    let io_err = |source: std::io::Error| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

/// Create a file that must not already exist.
pub(crate) async fn write_new(path: &Path, contents: &str) -> Result<(), RegistryError> {
    use tokio::io::AsyncWriteExt;

    let io_err = |source: std::io::Error| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                RegistryError::PathConflict(path.to_path_buf())
            } else {
                io_err(source)
            }
        })?;
    file.write_all(contents.as_bytes()).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_registry_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        assert!(load_registry(&layout).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_new_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        write_new(&path, "{}").await.unwrap();
        assert!(matches!(
            write_new(&path, "{}").await,
            Err(RegistryError::PathConflict(_))
        ));
    }
}
