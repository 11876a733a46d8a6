//! Generate the per-database config artifact from validated credentials.

use crate::config::types::*;
use crate::registry::DatabaseDescriptor;

fn fallback_block(vars: &EnvVarNames, credentials: &ConnectionConfig) -> FallbackBlock {
    FallbackBlock {
        username: FallbackField {
            env: vars.user.clone(),
            default: credentials.username.clone(),
        },
        password: FallbackField {
            env: vars.password.clone(),
            default: credentials.password.clone(),
        },
        database: FallbackField {
            env: vars.name.clone(),
            default: credentials.database.clone(),
        },
        host: FallbackField {
            env: vars.host.clone(),
            default: credentials.host.clone(),
        },
        port: FallbackField {
            env: vars.port.clone(),
            default: credentials.port,
        },
        dialect: credentials.dialect,
    }
}

fn env_only_block(vars: &EnvVarNames, dialect: Dialect) -> EnvOnlyBlock {
    let field = |env: &String| EnvField { env: env.clone() };
    EnvOnlyBlock {
        username: field(&vars.user),
        password: field(&vars.password),
        database: field(&vars.name),
        host: field(&vars.host),
        port: field(&vars.port),
        dialect,
    }
}

/// Structured config for `descriptor`. Development and test share the credentials as defaults;
/// production references environment variables only.
pub fn config_file(descriptor: &DatabaseDescriptor, credentials: &ConnectionConfig) -> ConfigFile {
    let vars = EnvVarNames::for_key(&descriptor.key);
    ConfigFile {
        development: fallback_block(&vars, credentials),
        test: fallback_block(&vars, credentials),
        production: env_only_block(&vars, credentials.dialect),
    }
}

/// Config artifact text for `descriptor`.
pub fn generate(
    descriptor: &DatabaseDescriptor,
    credentials: &ConnectionConfig,
) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(&config_file(descriptor, credentials))?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, EnvLookup};
    use std::collections::HashMap;

    fn reporting() -> (DatabaseDescriptor, ConnectionConfig) {
        let descriptor = DatabaseDescriptor::for_key("REPORTING_DB");
        let credentials = ConnectionConfig {
            username: "alice".into(),
            password: "s3cret".into(),
            database: "reports".into(),
            host: "db.internal".into(),
            port: 5432,
            dialect: Dialect::Postgres,
        };
        (descriptor, credentials)
    }

    #[test]
    fn development_username_prefers_env_override() {
        let (descriptor, credentials) = reporting();
        let file: ConfigFile = serde_json::from_str(&generate(&descriptor, &credentials).unwrap()).unwrap();
        assert_eq!(file.development.username.env, "REPORTING_DB_USER");
        assert_eq!(file.development.username.default, "alice");

        let mut env = HashMap::new();
        env.insert("REPORTING_DB_USER".to_string(), "bob".to_string());
        let resolved = file.resolve(Environment::Development, &env).unwrap();
        assert_eq!(resolved.username, "bob");

        let empty: HashMap<String, String> = HashMap::new();
        let resolved = file.resolve(Environment::Development, &empty).unwrap();
        assert_eq!(resolved.username, "alice");
        assert!(empty.var("REPORTING_DB_USER").is_none());
    }

    #[test]
    fn production_block_holds_no_literals() {
        let (descriptor, credentials) = reporting();
        let file = config_file(&descriptor, &credentials);
        let production = serde_json::to_string(&file.production).unwrap();
        assert!(production.contains("REPORTING_DB_USER"));
        for literal in ["alice", "s3cret", "reports", "db.internal", "5432"] {
            assert!(!production.contains(literal), "production block leaked {}", literal);
        }
    }

    #[test]
    fn development_block_round_trips_without_overrides() {
        let (descriptor, credentials) = reporting();
        let text = generate(&descriptor, &credentials).unwrap();
        let file: ConfigFile = serde_json::from_str(&text).unwrap();
        let env: HashMap<String, String> = HashMap::new();
        assert_eq!(file.resolve(Environment::Development, &env).unwrap(), credentials);
        assert_eq!(file.resolve(Environment::Test, &env).unwrap(), credentials);
    }

    #[test]
    fn dialect_is_literal_in_every_block() {
        let (descriptor, credentials) = reporting();
        let file = config_file(&descriptor, &credentials);
        assert_eq!(file.development.dialect, Dialect::Postgres);
        assert_eq!(file.production.dialect, Dialect::Postgres);
    }
}
