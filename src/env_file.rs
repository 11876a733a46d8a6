//! Credentials block appended to the project's `.env`.

use crate::config::{ConnectionConfig, EnvLookup, EnvVarNames, ProcessEnv};
use crate::error::RegistryError;
use std::collections::HashMap;
use std::path::Path;

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$' | '='));
    if !needs_quotes {
        value.to_string()
    } else if !value.contains('\'') {
        // single quotes are literal: no escapes, no substitution
        format!("'{}'", value)
    } else {
        format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$")
        )
    }
}

/// Labeled block of `KEY=value` lines for one database.
pub fn env_block(key: &str, credentials: &ConnectionConfig) -> String {
    let vars = EnvVarNames::for_key(key);
    format!(
        "\n# {key} Database Configuration\n{}={}\n{}={}\n{}={}\n{}={}\n{}={}\n",
        vars.user,
        quote_value(&credentials.username),
        vars.password,
        quote_value(&credentials.password),
        vars.name,
        quote_value(&credentials.database),
        vars.host,
        quote_value(&credentials.host),
        vars.port,
        credentials.port,
        key = key,
    )
}

/// Parsed `KEY=value` pairs of a `.env` file. A missing file is empty.
pub async fn read_env_file(path: &Path) -> Result<HashMap<String, String>, RegistryError> {
    if !crate::layout::path_exists(path).await? {
        return Ok(HashMap::new());
    }
    let env_err = |e: dotenvy::Error| RegistryError::EnvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_err)? {
        let (k, v) = item.map_err(env_err)?;
        vars.insert(k, v);
    }
    Ok(vars)
}

/// Whether `.env` already defines `name`. A missing file defines nothing.
pub async fn env_defines(path: &Path, name: &str) -> Result<bool, RegistryError> {
    Ok(read_env_file(path).await?.contains_key(name))
}

/// Process environment over the project's `.env`; variables already set in the process win.
#[derive(Clone, Debug, Default)]
pub struct ProjectEnv {
    file: HashMap<String, String>,
}

impl ProjectEnv {
    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        let file = read_env_file(path).await?;
        tracing::debug!(path = %path.display(), vars = file.len(), ".env loaded");
        Ok(ProjectEnv { file })
    }
}

impl EnvLookup for ProjectEnv {
    fn var(&self, name: &str) -> Option<String> {
        ProcessEnv.var(name).or_else(|| self.file.var(name))
    }
}

/// Append the credentials block for `key` unless `<KEY>_USER` is already present.
/// Returns whether anything was written.
pub async fn append_env_block(
    path: &Path,
    key: &str,
    credentials: &ConnectionConfig,
) -> Result<bool, RegistryError> {
    use tokio::io::AsyncWriteExt;

    let vars = EnvVarNames::for_key(key);
    if env_defines(path, &vars.user).await? {
        tracing::debug!(db = %key, "env block already present, skipping");
        return Ok(false);
    }
    let io_err = |source: std::io::Error| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(io_err)?;
    file.write_all(env_block(key, credentials).as_bytes())
        .await
        .map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    Ok(true)
}
