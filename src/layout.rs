//! On-disk layout of a generated backend: `DB/` for config artifacts and the registry,
//! `Models/<folder>/` for model files, `.env` for credentials.

use crate::error::RegistryError;
use crate::registry::DatabaseDescriptor;
use std::path::{Path, PathBuf};

pub const DB_DIR: &str = "DB";
pub const MODELS_DIR: &str = "Models";
pub const REGISTRY_FILE: &str = "registry.json";
pub const ENV_FILE: &str = ".env";

#[derive(Clone, Debug)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_dir(&self) -> PathBuf {
        self.root.join(DB_DIR)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.db_dir().join(REGISTRY_FILE)
    }

    pub fn env_path(&self) -> PathBuf {
        self.root.join(ENV_FILE)
    }

    /// Config artifact for `descriptor` (its `config_path` is relative to the root).
    pub fn config_path(&self, descriptor: &DatabaseDescriptor) -> PathBuf {
        self.root.join(&descriptor.config_path)
    }

    pub fn model_dir(&self, descriptor: &DatabaseDescriptor) -> PathBuf {
        self.models_dir().join(&descriptor.folder)
    }

    /// Fails unless `DB/` and `Models/` both exist under the root.
    pub async fn ensure_project(&self) -> Result<(), RegistryError> {
        for dir in [self.db_dir(), self.models_dir()] {
            if !path_exists(&dir).await? {
                return Err(RegistryError::NotAProject(dir));
            }
        }
        Ok(())
    }
}

pub(crate) async fn path_exists(path: &Path) -> Result<bool, RegistryError> {
    tokio::fs::try_exists(path).await.map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}
