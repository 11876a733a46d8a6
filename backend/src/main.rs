//! backend: manage a multi-database project and serve it.
//!
//! - `init`    create `DB/`, `Models/MAIN_DB/`, the primary config and `.env` block
//! - `add-db`  register another database after a connectivity check
//! - `list`    print the databases in startup order
//! - `serve`   bootstrap every database, initialize with retries, then serve HTTP

use clap::{Args, Parser, Subcommand};
use multidb_sdk::{
    add_database, bootstrap, common_routes_with_ready, current_environment, default_credentials, init_project,
    initialize_all, listen_port, load_registry, AppState, AttributeSpec, BootstrapOptions, ConnectionConfig, Dialect,
    DriverProbe, ModelCatalog, NewDatabase, ProjectEnv, ProjectLayout, RetryPolicy,
};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "backend", version, about = "Multi-database project tool and server")]
struct Cli {
    /// Project root containing DB/, Models/ and .env
    #[arg(long, global = true, env = "PROJECT_ROOT", default_value = ".")]
    root: PathBuf,

    /// Debug-level logging for this tool and the SDK
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set up the primary database for a project
    Init(InitArgs),
    /// Add a database: precheck, registry entry, config, starter model, .env block
    AddDb(AddDbArgs),
    /// List databases in startup order
    List,
    /// Bootstrap and initialize every database, then serve /health, /ready, /version
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, default_value = "postgres")]
    dialect: Dialect,
    #[arg(long)]
    database: String,
    /// Defaults to the dialect's conventional superuser
    #[arg(long)]
    username: Option<String>,
    #[arg(long, default_value = "")]
    password: String,
    #[arg(long, default_value = "localhost")]
    host: String,
    /// Defaults to the dialect's standard port
    #[arg(long)]
    port: Option<u16>,
}

impl CredentialArgs {
    fn into_config(self) -> ConnectionConfig {
        let mut config = default_credentials(self.dialect, &self.database);
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.password = self.password;
        config.host = self.host;
        config
    }
}

#[derive(Args, Debug)]
struct InitArgs {
    #[command(flatten)]
    credentials: CredentialArgs,
}

#[derive(Args, Debug)]
struct AddDbArgs {
    /// Upper-case identifier, e.g. REPORTING_DB
    #[arg(long)]
    key: String,
    #[command(flatten)]
    credentials: CredentialArgs,
    /// Table for the starter model
    #[arg(long, default_value = "users")]
    table: String,
    /// Column as name:TYPE[(len)][:pk][:auto][:unique][:not_null]; repeatable
    #[arg(long = "attr")]
    attributes: Vec<AttributeSpec>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Overrides PORT from the environment or the project's .env (default 3000)
    #[arg(long)]
    port: Option<u16>,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "multidb_sdk=debug,backend=debug"
    } else {
        "multidb_sdk=info,backend=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

async fn serve(layout: &ProjectLayout, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let env = ProjectEnv::load(&layout.env_path()).await?;
    let port = match args.port {
        Some(port) => port,
        None => listen_port(&env)?,
    };
    let options = BootstrapOptions {
        environment: current_environment(&env)?,
        ..Default::default()
    };
    tracing::info!(environment = options.environment.as_str(), "starting");

    let registry = load_registry(layout).await?;
    let catalog = ModelCatalog::new();
    let mut databases = bootstrap(layout, &registry, &catalog, &env, &options).await;
    let report = initialize_all(databases.connections_mut(), &RetryPolicy::default()).await;
    let failed = report.failed().count() + databases.unavailable().len();
    if failed > 0 {
        tracing::warn!(failed, "some databases are unavailable; serving anyway");
    }

    let state = AppState::new(databases, report);
    let shutdown_state = state.clone();
    let app = common_routes_with_ready(state);
    let listener = TcpListener::bind((args.host.as_str(), port)).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    shutdown_state.databases.close_all().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let layout = ProjectLayout::new(cli.root);

    match cli.command {
        Commands::Init(args) => {
            let credentials = args.credentials.into_config();
            let created = init_project(&layout, &credentials).await?;
            for path in &created {
                println!("created {}", path.display());
            }
            if created.is_empty() {
                println!("project already initialized");
            }
        }
        Commands::AddDb(args) => {
            let request = NewDatabase {
                key: args.key,
                credentials: args.credentials.into_config(),
                table: args.table,
                attributes: args.attributes,
            };
            let added = add_database(&layout, &request, &DriverProbe::default()).await?;
            println!("added {}", added.descriptor.key);
            println!("  config: {}", added.config_path.display());
            println!("  model:  {}", added.model_path.display());
            if !added.env_updated {
                println!("  .env already defines {}_USER, left unchanged", added.descriptor.key);
            }
        }
        Commands::List => {
            let registry = load_registry(&layout).await?;
            for descriptor in registry.startup_order() {
                println!("{}\t{}\t{}", descriptor.key, descriptor.folder, descriptor.config_path);
            }
        }
        Commands::Serve(args) => serve(&layout, args).await?,
    }
    Ok(())
}
