use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use assetry::config::ServerConfig;
use assetry::error::Error;
use assetry::server::{AppState, create_router, spawn_stats_recorder};
use assetry::service::Services;
use assetry::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "assetry")]
#[command(about = "An organizational asset-tracking server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML configuration file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory holding the database
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create the database and a system super user)
    Init {
        /// Data directory holding the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Name of the system super user
        #[arg(long)]
        username: String,

        /// Password of the system super user; generated when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

fn run_init(data_dir: PathBuf, username: &str, password: Option<String>) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let services = Services::new(Arc::new(store), None);
    let (user, generated) = match services.bootstrap_admin(username, password) {
        Ok(created) => created,
        Err(Error::UserHasExisted) => bail!("User '{username}' already exists"),
        Err(e) => return Err(e.into()),
    };

    println!();
    println!("========================================");
    println!("Created system super user '{}' (id {})", user.username, user.id);
    if let Some(password) = generated {
        println!();
        println!("Password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
    }
    println!();
    println!("Database: {}", config.db_path().display());
    println!("========================================");
    println!();

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!(
            "Server not initialized. Run 'assetry admin init' first to create the database and a system super user."
        );
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    let store: Arc<dyn Store> = Arc::new(store);

    if let Some(interval) = config.stats_interval() {
        spawn_stats_recorder(store.clone(), interval);
    }

    let state = Arc::new(AppState::new(store, config.token_ttl()));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("assetry=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                username,
                password,
            } => {
                run_init(data_dir, &username, password)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }

            run_serve(config).await?;
        }
    }

    Ok(())
}
