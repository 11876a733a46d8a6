//! Registration flows against an on-disk project: registry mutation, precheck gating, init.

use async_trait::async_trait;
use multidb_sdk::precheck::test_connection;
use multidb_sdk::{
    add_database, init_project, load_registry, register_database, AppError, ConnectionConfig, ConnectivityProbe,
    DatabaseDescriptor, Dialect, DriverError, NewDatabase, ProjectLayout, RegistryError,
};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

struct FixedProbe {
    reachable: bool,
    calls: AtomicU32,
}

impl FixedProbe {
    fn new(reachable: bool) -> Self {
        FixedProbe {
            reachable,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for FixedProbe {
    async fn test_connection(&self, _key: &str, _candidate: &ConnectionConfig) -> Result<bool, DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reachable)
    }
}

fn credentials() -> ConnectionConfig {
    ConnectionConfig {
        username: "alice".into(),
        password: "s3cret".into(),
        database: "reports".into(),
        host: "localhost".into(),
        port: 5432,
        dialect: Dialect::Postgres,
    }
}

fn request(key: &str) -> NewDatabase {
    NewDatabase {
        key: key.into(),
        credentials: credentials(),
        table: "reports".into(),
        attributes: Vec::new(),
    }
}

async fn project() -> (tempfile::TempDir, ProjectLayout) {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    tokio::fs::create_dir_all(layout.db_dir()).await.unwrap();
    tokio::fs::create_dir_all(layout.models_dir()).await.unwrap();
    (dir, layout)
}

/// Every file under `root`, relative and sorted.
fn snapshot(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.push(format!("{}/", path.strip_prefix(root).unwrap().display()));
                walk(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().display().to_string());
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

#[tokio::test]
async fn appends_in_order() {
    let (_dir, layout) = project().await;
    register_database(&layout, DatabaseDescriptor::for_key("A_DB")).await.unwrap();
    let registry = register_database(&layout, DatabaseDescriptor::for_key("B_DB")).await.unwrap();
    assert_eq!(registry.len(), 2);

    let reloaded = load_registry(&layout).await.unwrap();
    let keys: Vec<&str> = reloaded.entries().iter().map(|d| d.key.as_str()).collect();
    assert_eq!(keys, ["A_DB", "B_DB"]);
    let order: Vec<String> = reloaded.startup_order().into_iter().map(|d| d.key).collect();
    assert_eq!(order, ["MAIN_DB", "A_DB", "B_DB"]);
}

#[tokio::test]
async fn duplicate_key_leaves_registry_unchanged() {
    let (_dir, layout) = project().await;
    register_database(&layout, DatabaseDescriptor::for_key("A_DB")).await.unwrap();
    let before = tokio::fs::read_to_string(layout.registry_path()).await.unwrap();

    let err = register_database(&layout, DatabaseDescriptor::for_key("A_DB")).await.unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateKey(ref k) if k == "A_DB"));
    let err = register_database(&layout, DatabaseDescriptor::primary()).await.unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateKey(_)));

    let after = tokio::fs::read_to_string(layout.registry_path()).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn existing_model_folder_is_a_conflict() {
    let (_dir, layout) = project().await;
    let descriptor = DatabaseDescriptor::for_key("A_DB");
    tokio::fs::create_dir_all(layout.model_dir(&descriptor)).await.unwrap();

    let err = register_database(&layout, descriptor).await.unwrap_err();
    assert!(matches!(err, RegistryError::PathConflict(_)));
    assert!(load_registry(&layout).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_key_is_rejected() {
    let (_dir, layout) = project().await;
    let err = register_database(&layout, DatabaseDescriptor::for_key("reports")).await.unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
}

#[tokio::test]
async fn failed_precheck_writes_nothing() {
    let (dir, layout) = project().await;
    let before = snapshot(dir.path());
    let probe = FixedProbe::new(false);

    let err = add_database(&layout, &request("REPORTING_DB"), &probe).await.unwrap_err();
    assert!(matches!(err, AppError::ConnectivityFailed(ref k) if k == "REPORTING_DB"));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn invalid_request_never_reaches_the_probe() {
    let (dir, layout) = project().await;
    let before = snapshot(dir.path());
    let probe = FixedProbe::new(true);

    let mut bad_table = request("REPORTING_DB");
    bad_table.table = "Reports".into();
    assert!(add_database(&layout, &bad_table, &probe).await.is_err());

    let mut bad_type = request("REPORTING_DB");
    bad_type.attributes = vec!["total:MONEY".parse().unwrap()];
    assert!(matches!(
        add_database(&layout, &bad_type, &probe).await.unwrap_err(),
        AppError::Model(_)
    ));

    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn successful_add_writes_every_artifact() {
    let (_dir, layout) = project().await;
    let mut req = request("REPORTING_DB");
    req.attributes = vec![
        "id:INTEGER:pk:auto".parse().unwrap(),
        "title:STRING(120):not_null".parse().unwrap(),
    ];

    let added = add_database(&layout, &req, &FixedProbe::new(true)).await.unwrap();
    assert!(added.env_updated);
    assert_eq!(added.config_path, layout.root().join("DB/REPORTING_DB.config.json"));
    assert_eq!(added.model_path, layout.root().join("Models/REPORTING_DB/reports.json"));

    let registry = load_registry(&layout).await.unwrap();
    assert_eq!(registry.entries(), [DatabaseDescriptor::for_key("REPORTING_DB")]);

    let config: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&added.config_path).await.unwrap()).unwrap();
    assert_eq!(config["development"]["username"]["default"], "alice");
    assert_eq!(config["production"]["host"]["env"], "REPORTING_DB_HOST");

    let model: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&added.model_path).await.unwrap()).unwrap();
    assert_eq!(model["name"], "Reports");
    assert_eq!(model["attributes"][1]["length"], "120");

    let env = tokio::fs::read_to_string(layout.env_path()).await.unwrap();
    assert!(env.contains("# REPORTING_DB Database Configuration"));
    assert!(env.contains("REPORTING_DB_USER=alice"));

    let err = add_database(&layout, &req, &FixedProbe::new(true)).await.unwrap_err();
    assert!(matches!(err, AppError::Registry(RegistryError::DuplicateKey(_))));
}

#[tokio::test]
async fn existing_env_block_is_kept() {
    let (_dir, layout) = project().await;
    tokio::fs::write(layout.env_path(), "REPORTING_DB_USER=bob\n").await.unwrap();

    let added = add_database(&layout, &request("REPORTING_DB"), &FixedProbe::new(true)).await.unwrap();
    assert!(!added.env_updated);
    let env = tokio::fs::read_to_string(layout.env_path()).await.unwrap();
    assert_eq!(env, "REPORTING_DB_USER=bob\n");
}

#[tokio::test]
async fn add_outside_a_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let err = add_database(&layout, &request("REPORTING_DB"), &FixedProbe::new(true)).await.unwrap_err();
    assert!(matches!(err, AppError::Registry(RegistryError::NotAProject(_))));
}

#[tokio::test]
async fn unreachable_server_is_a_failed_precheck() {
    let mut candidate = credentials();
    candidate.host = "127.0.0.1".into();
    candidate.port = 1;
    let reachable = test_connection("REPORTING_DB", &candidate, Duration::from_secs(5)).await.unwrap();
    assert!(!reachable);
}

#[tokio::test]
async fn init_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let mut creds = credentials();
    creds.database = "app_db".into();

    let created = init_project(&layout, &creds).await.unwrap();
    assert!(created.contains(&layout.root().join("DB/MAIN_DB.config.json")));
    assert!(created.contains(&layout.registry_path()));
    assert!(created.contains(&layout.env_path()));
    layout.ensure_project().await.unwrap();
    assert!(load_registry(&layout).await.unwrap().is_empty());

    let before = snapshot(dir.path());
    assert!(init_project(&layout, &creds).await.unwrap().is_empty());
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn hand_edited_registry_is_revalidated() {
    let (_dir, layout) = project().await;
    let cases = [
        (
            r#"[{"key": "MAIN_DB", "folder": "MAIN_DB", "configPath": "DB/MAIN_DB.config.json"}]"#,
            "reserved",
        ),
        (
            r#"[{"key": "A_DB", "folder": "A_DB", "configPath": "DB/A_DB.config.json"},
                {"key": "A_DB", "folder": "A_DB", "configPath": "DB/A_DB.config.json"}]"#,
            "duplicate",
        ),
        (
            r#"[{"key": "lower key", "folder": "x", "configPath": "DB/x.config.json"}]"#,
            "key",
        ),
        (
            r#"[{"key": "X_DB", "folder": "../x", "configPath": "DB/X_DB.config.json"}]"#,
            "folder",
        ),
        (
            r#"[{"key": "X_DB", "folder": "X_DB", "configPath": "../X_DB.config.json"}]"#,
            "config path",
        ),
    ];
    for (text, case) in cases {
        tokio::fs::write(layout.registry_path(), text).await.unwrap();
        let err = load_registry(&layout).await.unwrap_err();
        assert!(
            matches!(err, RegistryError::DuplicateKey(_) | RegistryError::Validation(_)),
            "{}: {:?}",
            case,
            err
        );
    }
}

#[tokio::test]
async fn starter_model_that_cannot_load_is_rejected_before_writing() {
    let (dir, layout) = project().await;
    let before = snapshot(dir.path());
    let probe = FixedProbe::new(true);

    for attr in ["status:ENUM", "id:INTEGER", "title:STRING(abc)"] {
        let mut req = request("R_DB");
        req.attributes = vec![attr.parse().unwrap()];
        let err = add_database(&layout, &req, &probe).await.unwrap_err();
        assert!(matches!(err, AppError::Model(_)), "{}: {:?}", attr, err);
    }

    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    assert_eq!(snapshot(dir.path()), before);
}
