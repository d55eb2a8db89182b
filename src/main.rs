use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use feedboard::app::{App, AppEvent};
use feedboard::config::Config;
use feedboard::proxy::{self, ProxyState};
use feedboard::read_state::ReadStateStore;
use feedboard::storage::{Database, DatabaseError};
use feedboard::ui;

/// Get the config directory path (~/.config/feedboard/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedboard"))
}

#[derive(Parser, Debug)]
#[command(name = "feedboard", about = "Terminal dashboard for aggregated feed backends")]
struct Args {
    /// Config file (default: ~/.config/feedboard/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local database (default: ~/.config/feedboard/feedboard.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Backend base URL, overrides config and environment
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Forget every item marked as read, then exit
    #[arg(long)]
    reset_read: bool,

    /// Run the HTTP proxy instead of the terminal UI
    #[arg(long)]
    serve_proxy: bool,

    /// Proxy listen address, overrides config
    #[arg(long, value_name = "ADDR", requires = "serve_proxy")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // User-only access: the database holds reading history.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            eprintln!(
                "Warning: failed to set permissions on {}: {}",
                config_dir.display(),
                e
            );
        }
    }

    init_tracing(&config_dir, args.serve_proxy)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(url) = &args.backend_url {
        config.backend_url = url.clone();
        config.validate().context("Invalid --backend-url")?;
    }
    if let Some(listen) = &args.listen {
        config.proxy_listen = listen.clone();
    }
    tracing::info!(backend = %config.backend_url, "Configuration loaded");

    if args.serve_proxy {
        return run_proxy(&config).await;
    }

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config_dir.join("feedboard.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of feedboard appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    if args.reset_read {
        let mut read_state = ReadStateStore::load(db.clone()).await?;
        let count = read_state.len();
        read_state.reset().await;
        db.close().await;
        println!("Forgot {} read items.", count);
        return Ok(());
    }

    let mut app = App::new(config, db.clone())
        .await
        .context("Failed to create application")?;

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    let result = ui::run(&mut app, event_tx, event_rx).await;

    drop(app);
    db.close().await;
    result
}

/// Log to a file while the TUI owns the terminal, to stderr otherwise.
/// `RUST_LOG` controls the filter.
fn init_tracing(config_dir: &std::path::Path, to_stderr: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if to_stderr {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(());
    }

    let log_path = config_dir.join("feedboard.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(())
}

async fn run_proxy(config: &Config) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let state = ProxyState::new(client, &config.disabled_proxy_paths);

    let listener = TcpListener::bind(&config.proxy_listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.proxy_listen))?;
    let addr = listener.local_addr()?;
    println!("Proxy listening on http://{}", addr);

    proxy::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down proxy");
    })
    .await
}
