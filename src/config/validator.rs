//! Identifier and credential validation applied before anything is written.

use crate::config::ConnectionConfig;
use crate::error::RegistryError;
use regex::Regex;

const KEY_PATTERN: &str = r"^[A-Z][A-Z0-9_]*$";
const TABLE_PATTERN: &str = r"^[a-z][a-z0-9_]*$";
const LENGTH_PATTERN: &str = r"^\d+(,\d+)?$";

fn matches(pattern: &str, value: &str) -> Result<bool, RegistryError> {
    let re = Regex::new(pattern).map_err(|e| RegistryError::Validation(format!("invalid pattern: {}", e)))?;
    Ok(re.is_match(value))
}

/// Database keys are UPPERCASE with underscores (e.g. `REPORTING_DB`).
pub fn validate_key(key: &str) -> Result<(), RegistryError> {
    if key.trim().is_empty() {
        return Err(RegistryError::Validation("database key cannot be empty".into()));
    }
    if !matches(KEY_PATTERN, key)? {
        return Err(RegistryError::Validation(format!(
            "database key '{}' must be UPPERCASE with underscores (e.g. MY_DB)",
            key
        )));
    }
    Ok(())
}

/// Table and column names are lowercase with underscores (e.g. `user_profiles`).
pub fn validate_table_name(name: &str) -> Result<(), RegistryError> {
    if !matches(TABLE_PATTERN, name)? {
        return Err(RegistryError::Validation(format!(
            "'{}' must be lowercase with underscores (e.g. user_profiles)",
            name
        )));
    }
    Ok(())
}

/// Column length or precision: `120` or `10,2`.
pub fn validate_length(length: &str) -> Result<(), RegistryError> {
    if !matches(LENGTH_PATTERN, length)? {
        return Err(RegistryError::Validation(format!(
            "length '{}' must be a number or precision,scale (e.g. 255 or 10,2)",
            length
        )));
    }
    Ok(())
}

/// Model folder: a single path component under `Models/`.
pub fn validate_folder(folder: &str) -> Result<(), RegistryError> {
    if folder.trim().is_empty() || folder.contains(['/', '\\']) || folder == "." || folder == ".." {
        return Err(RegistryError::Validation(format!(
            "model folder '{}' must be a single directory name",
            folder
        )));
    }
    Ok(())
}

/// Config artifact path: relative to the project root, no parent components.
pub fn validate_config_path(path: &str) -> Result<(), RegistryError> {
    let p = std::path::Path::new(path);
    let escapes = p
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir));
    if path.trim().is_empty() || escapes {
        return Err(RegistryError::Validation(format!(
            "config path '{}' must be relative to the project root",
            path
        )));
    }
    Ok(())
}

pub fn validate_credentials(config: &ConnectionConfig) -> Result<(), RegistryError> {
    if config.database.trim().is_empty() {
        return Err(RegistryError::Validation("database name cannot be empty".into()));
    }
    if config.username.trim().is_empty() {
        return Err(RegistryError::Validation("username cannot be empty".into()));
    }
    if config.host.trim().is_empty() {
        return Err(RegistryError::Validation("host cannot be empty".into()));
    }
    if config.port == 0 {
        return Err(RegistryError::Validation("port must be between 1 and 65535".into()));
    }
    Ok(())
}
