use clap::{Parser, Subcommand};
use slyde::accounts::{Account, AccountStore, MemoryAccountStore};
use slyde::api::{self, AppState};
use slyde::config::{self, ServerConfig};
use slyde::imaging::RustBackend;
use slyde::service::ImageService;
use slyde::{storage, sweep, telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

#[derive(Parser)]
#[command(name = "slyde-server")]
#[command(about = "Image upload, resize and serving server")]
#[command(long_about = "\
Image upload, resize and serving server

Uploaded images are validated, stored at a canonical resolution plus a
fixed-size thumbnail, and served at any requested width. Resized variants
are generated on first request and cached on disk per width bucket.

Storage layout:

  <files_root>/users/<user_id>/
  ├── images/
  │   ├── <image_id>.jpg           # canonical
  │   └── <image_id>-<tenths>.jpg  # bucketed variant (e.g. -3 = 30%)
  └── thumbnails/
      └── <image_id>.jpg

Run 'slyde-server gen-config' to generate a documented slyde.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "slyde.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a stock slyde.toml with all options documented
    GenConfig,
    /// Create an account or update its quota
    AddAccount {
        /// User id as forwarded by the auth gateway
        #[arg(long)]
        user: String,
        /// Image quota (default: accounts.default_quota)
        #[arg(long)]
        quota: Option<usize>,
    },
    /// Remove unreferenced artifacts (orphaned variants, failed uploads, temp files)
    Sweep {
        /// Only remove files older than this many days
        #[arg(long, default_value_t = 7)]
        older_than_days: u64,
        /// Report what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        command => command,
    };

    let config = config::load_config(&cli.config)?;
    telemetry::init(&config.logging)?;

    match command {
        Command::Serve { host, port } => serve(config, host, port).await?,
        Command::AddAccount { user, quota } => {
            if config.accounts.snapshot.is_none() {
                return Err("accounts.snapshot is not set; the account would be lost on exit".into());
            }
            let store = open_store(&config)?;
            let quota = quota.unwrap_or(config.accounts.default_quota);
            let account = match store.account(&user).await? {
                Some(mut existing) => {
                    existing.image_quota = quota;
                    existing
                }
                None => Account::new(&user, quota),
            };
            store.upsert_account(account).await?;
            println!("Account {user}: quota {quota}");
        }
        Command::Sweep {
            older_than_days,
            dry_run,
        } => {
            let store = open_store(&config)?;
            let layout = storage::prepare_files_root(&config.storage.files_root)?;
            let live = sweep::live_images(&store.accounts().await?);
            let max_age = sweep::max_age_from_days(older_than_days);
            let report = tokio::task::spawn_blocking(move || {
                sweep::sweep(&layout, &live, max_age, SystemTime::now(), dry_run)
            })
            .await?;
            let verb = if dry_run { "would remove" } else { "removed" };
            for path in &report.removed {
                println!("{verb} {}", path.display());
            }
            println!("Sweep: {report}");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn open_store(config: &ServerConfig) -> Result<Arc<MemoryAccountStore>, Box<dyn std::error::Error>> {
    let store = match &config.accounts.snapshot {
        Some(path) => MemoryAccountStore::open(path)?,
        None => MemoryAccountStore::new(),
    };
    Ok(Arc::new(store))
}

async fn serve(
    mut config: ServerConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let layout = storage::prepare_files_root(&config.storage.files_root)?;
    let store = open_store(&config)?;
    let service = ImageService::new(
        Arc::new(RustBackend::new()),
        store,
        layout,
        &config.images,
        config.storage.dir_mode,
    );
    let state = AppState {
        service: Arc::new(service),
        user_header: config.auth.user_header.parse()?,
        max_upload_bytes: config.server.max_upload_bytes,
    };
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        files_root = %config.storage.files_root.display(),
        "slyde-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("slyde-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
