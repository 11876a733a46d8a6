use axum::body::Body;
use axum::http::{Request, StatusCode};
use multidb_sdk::{
    bootstrap, common_routes, common_routes_with_ready, generate, AppState, BootstrapOptions, ConnectionConfig,
    DatabaseDescriptor, Databases, Dialect, InitReport, ModelCatalog, ProjectLayout, Registry,
};
use std::collections::HashMap;
use tower::ServiceExt;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_and_version() {
    let (status, body) = get(common_routes(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(common_routes(), "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "multidb-sdk");
}

#[tokio::test]
async fn ready_with_nothing_failed() {
    let state = AppState::new(Databases::default(), InitReport::default());
    let (status, body) = get(common_routes_with_ready(state), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ready_reports_unavailable_database() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let env: HashMap<String, String> = HashMap::new();
    let databases = bootstrap(
        &layout,
        &Registry::new(),
        &ModelCatalog::new(),
        &env,
        &BootstrapOptions::default(),
    )
    .await;

    let state = AppState::new(databases, InitReport::default());
    let (status, body) = get(common_routes_with_ready(state), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["databases"][0]["key"], "MAIN_DB");
    assert_eq!(body["databases"][0]["state"], "failed");
    assert!(body["databases"][0]["error"].is_string());
}

#[tokio::test]
async fn ready_lists_databases_in_startup_order() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let mut registry = Registry::new();
    registry.append(DatabaseDescriptor::for_key("A_DB")).unwrap();

    // MAIN_DB has no config and fails to bootstrap; A_DB gets a lazy pool.
    let a_db = DatabaseDescriptor::for_key("A_DB");
    let creds = ConnectionConfig {
        username: "postgres".into(),
        password: String::new(),
        database: "a".into(),
        host: "127.0.0.1".into(),
        port: 1,
        dialect: Dialect::Postgres,
    };
    let config_path = layout.config_path(&a_db);
    tokio::fs::create_dir_all(config_path.parent().unwrap()).await.unwrap();
    tokio::fs::write(&config_path, generate(&a_db, &creds).unwrap()).await.unwrap();

    let env: HashMap<String, String> = HashMap::new();
    let databases = bootstrap(&layout, &registry, &ModelCatalog::new(), &env, &BootstrapOptions::default()).await;
    assert_eq!(databases.unavailable().len(), 1);

    let state = AppState::new(databases, InitReport::default());
    let (status, body) = get(common_routes_with_ready(state), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let keys: Vec<&str> = body["databases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["MAIN_DB", "A_DB"]);
    assert_eq!(body["databases"][0]["state"], "failed");
    assert_eq!(body["databases"][1]["state"], "pending");
}
