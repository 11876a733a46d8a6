//! Resolve config artifacts against the process environment.

use crate::config::types::*;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Environment variable that selects the config block at startup.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Environment variable for the HTTP listener port.
pub const PORT_VAR: &str = "PORT";
pub const DEFAULT_PORT: u16 = 3000;

/// Source of environment overrides. Empty values count as unset.
pub trait EnvLookup: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads `std::env`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// Environment selected by `APP_ENV`, development when unset.
pub fn current_environment(env: &dyn EnvLookup) -> Result<Environment, ConfigError> {
    env.var(ENVIRONMENT_VAR)
        .map(|v| v.parse())
        .unwrap_or(Ok(Environment::Development))
}

/// HTTP listener port from `PORT`, 3000 when unset.
pub fn listen_port(env: &dyn EnvLookup) -> Result<u16, ConfigError> {
    match env.var(PORT_VAR) {
        Some(value) => parse_port(PORT_VAR, &value),
        None => Ok(DEFAULT_PORT),
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ConfigError::InvalidPort {
            var: var.to_string(),
            value: value.to_string(),
        })
}

impl FallbackBlock {
    pub fn resolve(&self, env: &dyn EnvLookup) -> Result<ConnectionConfig, ConfigError> {
        let text = |f: &FallbackField<String>| env.var(&f.env).unwrap_or_else(|| f.default.clone());
        let port = match env.var(&self.port.env) {
            Some(v) => parse_port(&self.port.env, &v)?,
            None => self.port.default,
        };
        Ok(ConnectionConfig {
            username: text(&self.username),
            password: text(&self.password),
            database: text(&self.database),
            host: text(&self.host),
            port,
            dialect: self.dialect,
        })
    }
}

impl EnvOnlyBlock {
    pub fn resolve(&self, env: &dyn EnvLookup) -> Result<ConnectionConfig, ConfigError> {
        let required = |f: &EnvField| {
            env.var(&f.env)
                .ok_or_else(|| ConfigError::MissingEnv { var: f.env.clone() })
        };
        let port_raw = required(&self.port)?;
        Ok(ConnectionConfig {
            username: required(&self.username)?,
            password: required(&self.password)?,
            database: required(&self.database)?,
            host: required(&self.host)?,
            port: parse_port(&self.port.env, &port_raw)?,
            dialect: self.dialect,
        })
    }
}

impl ConfigFile {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn resolve(
        &self,
        environment: Environment,
        env: &dyn EnvLookup,
    ) -> Result<ConnectionConfig, ConfigError> {
        match environment {
            Environment::Development => self.development.resolve(env),
            Environment::Test => self.test.resolve(env),
            Environment::Production => self.production.resolve(env),
        }
    }
}

/// Read a config artifact and resolve the block for `environment`.
pub async fn load_connection_config(
    path: &Path,
    environment: Environment,
    env: &dyn EnvLookup,
) -> Result<ConnectionConfig, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let file = ConfigFile::parse(path, &text)?;
    tracing::debug!(path = %path.display(), env = environment.as_str(), "config loaded");
    file.resolve(environment, env)
}
