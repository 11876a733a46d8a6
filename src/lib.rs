//! Multi-database SDK: per-database config artifacts, a JSON registry, model loading with
//! association wiring, and startup initialization with retries.

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod driver;
pub mod env_file;
pub mod error;
pub mod init;
pub mod layout;
pub mod model;
pub mod precheck;
pub mod project;
pub mod registry;
pub mod routes;
pub mod state;
pub mod store;
pub mod sync;

pub use bootstrap::{bootstrap, BootstrapOptions, Databases, Unavailable};
pub use config::{
    current_environment, generate, listen_port, load_connection_config, ConnectionConfig, Dialect, EnvLookup, Environment,
    ProcessEnv,
};
pub use connection::{Connection, ConnectionState};
pub use driver::PoolSettings;
pub use env_file::ProjectEnv;
pub use error::{
    AppError, AssociationError, ConfigError, DriverError, InitError, ModelError, RegistryError,
};
pub use init::{initialize, initialize_all, InitOutcome, InitReport, ManagedConnection, RetryPolicy};
pub use layout::ProjectLayout;
pub use model::{
    AssociationHook, AttributeSpec, DeclarativeModel, ModelCatalog, ModelDefinition, ModelFactory, ModelSpec,
    Siblings, TypeRegistry,
};
pub use precheck::{ConnectivityProbe, DriverProbe};
pub use project::{add_database, default_credentials, init_project, AddedDatabase, NewDatabase};
pub use registry::{DatabaseDescriptor, Registry, PRIMARY_KEY};
pub use routes::{common_routes, common_routes_with_ready};
pub use state::AppState;
pub use store::{load_registry, register_database, save_registry};
