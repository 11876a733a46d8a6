//! Typed errors for registration, config resolution, model binding and startup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("environment variable {var} is required")]
    MissingEnv { var: String },
    #[error("invalid port '{value}' in {var}")]
    InvalidPort { var: String, value: String },
    #[error("unknown dialect '{0}' (expected mysql, mariadb or postgres)")]
    UnknownDialect(String),
    #[error("unknown environment '{0}' (expected development, test or production)")]
    UnknownEnvironment(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("database with key '{0}' already exists")]
    DuplicateKey(String),
    #[error("path already exists: {}", .0.display())]
    PathConflict(PathBuf),
    #[error("not a project root: {} is missing", .0.display())]
    NotAProject(PathBuf),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("env file {}: {message}", path.display())]
    EnvFile { path: PathBuf, message: String },
    #[error("registry {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(
        "database driver for '{dialect}' not found; rebuild with `--features {feature}` to enable it"
    )]
    DriverMissing {
        dialect: &'static str,
        feature: &'static str,
    },
    #[error("connection timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file {}: {message}", path.display())]
    File { path: PathBuf, message: String },
    #[error("duplicate model '{model}' on connection {connection}")]
    DuplicateModel { connection: String, model: String },
    #[error("type '{name}' is not supported by {dialect}")]
    UnsupportedType { dialect: &'static str, name: String },
    #[error("model '{model}': {message}")]
    Invalid { model: String, message: String },
}

#[derive(Error, Debug)]
pub enum AssociationError {
    #[error("model '{from}' on {connection} references unknown model '{target}'")]
    UnknownModel {
        connection: String,
        from: String,
        target: String,
    },
    #[error(
        "model '{from}' on {connection} references '{target}' on {target_connection}; associations across databases are not supported"
    )]
    CrossConnection {
        connection: String,
        from: String,
        target: String,
        target_connection: String,
    },
}

#[derive(Error, Debug)]
pub enum InitError {
    #[error("{key} could not be initialized after {attempts} attempts: {source}")]
    Exhausted {
        key: String,
        attempts: u32,
        #[source]
        source: DriverError,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Association(#[from] AssociationError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("connection test failed for {0}; database not added")]
    ConnectivityFailed(String),
}
