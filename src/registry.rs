//! Database registry: the ordered list of non-primary databases brought online at startup.

use crate::config::{validate_config_path, validate_folder, validate_key};
use crate::error::RegistryError;
use crate::layout::DB_DIR;
use serde::{Deserialize, Serialize};

/// Key of the always-present primary database. Reserved; never stored in the registry.
pub const PRIMARY_KEY: &str = "MAIN_DB";

/// Identifying record for one configured database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub key: String,
    /// Model folder under `Models/`.
    pub folder: String,
    /// Config artifact path relative to the project root.
    #[serde(rename = "configPath")]
    pub config_path: String,
}

impl DatabaseDescriptor {
    /// Conventional descriptor: folder named by the key, config at `DB/<KEY>.config.json`.
    pub fn for_key(key: &str) -> Self {
        DatabaseDescriptor {
            key: key.to_string(),
            folder: key.to_string(),
            config_path: format!("{}/{}.config.json", DB_DIR, key),
        }
    }

    pub fn primary() -> Self {
        Self::for_key(PRIMARY_KEY)
    }

    pub fn is_primary(&self) -> bool {
        self.key == PRIMARY_KEY
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    entries: Vec<DatabaseDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { entries: Vec::new() }
    }

    pub fn entries(&self) -> &[DatabaseDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Structural key lookup; the primary key is always considered present.
    pub fn contains_key(&self, key: &str) -> bool {
        key == PRIMARY_KEY || self.entries.iter().any(|d| d.key == key)
    }

    /// Primary descriptor followed by registry order.
    pub fn startup_order(&self) -> Vec<DatabaseDescriptor> {
        std::iter::once(DatabaseDescriptor::primary())
            .chain(self.entries.iter().cloned())
            .collect()
    }

    /// Rebuild a registry from stored entries, applying the same checks as `append`.
    pub fn from_entries(entries: Vec<DatabaseDescriptor>) -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        for descriptor in entries {
            registry.append(descriptor)?;
        }
        Ok(registry)
    }

    /// Validate and append. Existing entries are left untouched.
    pub fn append(&mut self, descriptor: DatabaseDescriptor) -> Result<(), RegistryError> {
        validate_key(&descriptor.key)?;
        validate_folder(&descriptor.folder)?;
        validate_config_path(&descriptor.config_path)?;
        if self.contains_key(&descriptor.key) {
            return Err(RegistryError::DuplicateKey(descriptor.key));
        }
        self.entries.push(descriptor);
        Ok(())
    }
}
