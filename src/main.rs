use anyhow::Result;
use clap::{Parser, Subcommand};
use letterbox_auth::{
    DelegatedAuthManager, GoogleOAuthClient, IdentityVerifier, KeySet, SHARED_SECRET_KID,
    jwks::fetch_jwks,
};
use letterbox_config::{Config, LogConfig, LogFormat};
use letterbox_drive::GoogleDriveClient;
use letterbox_server::{AppState, StorageStatus};
use letterbox_store::{SqliteStore, UnavailableStore};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "letterbox", about = "letterbox: letter drafts with Google Drive export")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the listening port (default: 5000).
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the listening address (default: 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
        /// SQLite database path (default: ~/.letterbox/letterbox.db).
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
    /// Show the Drive connection state of a user.
    Status {
        /// Principal id (the identity provider's `sub`).
        uid: String,
        /// SQLite database path (default: ~/.letterbox/letterbox.db).
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
    /// Forget the stored Drive tokens of a user.
    Disconnect {
        /// Principal id.
        uid: String,
        /// SQLite database path (default: ~/.letterbox/letterbox.db).
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            port,
            host,
            db,
        } => cmd_serve(config, port, host, db).await,
        Commands::Status { uid, db } => cmd_status(uid, db).await,
        Commands::Disconnect { uid, db } => cmd_disconnect(uid, db).await,
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
    db: Option<PathBuf>,
) -> Result<()> {
    let mut config =
        Config::load(config_path.as_deref()).map_err(|e| anyhow::anyhow!("config error: {e}"))?;
    if let Some(p) = port {
        config.port = p;
    }
    if let Some(h) = host {
        config.host = h;
    }
    if db.is_some() {
        config.database.path = db;
    }
    init_tracing(&config.log);

    let http = rquest::Client::new();
    let verifier = build_verifier(&config, &http).await;

    let oauth = Arc::new(GoogleOAuthClient::new(
        http.clone(),
        config.google.client_id.clone(),
        config.google.client_secret.clone(),
    ));
    let documents = Arc::new(GoogleDriveClient::new(http));

    let state = match open_store(config.database.path.clone()).await {
        Ok(store) => AppState::new(
            config.clone(),
            verifier,
            Arc::new(store),
            oauth,
            documents,
            StorageStatus::Available,
        ),
        Err(e) => {
            tracing::error!(error = %e, "storage unavailable, serving degraded");
            let reason = e.to_string();
            AppState::new(
                config.clone(),
                verifier,
                Arc::new(UnavailableStore::new(reason.clone())),
                oauth,
                documents,
                StorageStatus::Unavailable(reason),
            )
        }
    };
    let app = letterbox_server::make_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "letterbox listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Load signing keys once; a failed fetch leaves only the local secret.
async fn build_verifier(config: &Config, http: &rquest::Client) -> IdentityVerifier {
    let identity = &config.identity;
    let mut keys = KeySet::new();
    match fetch_jwks(http, &identity.jwks_url).await {
        Ok(fetched) => {
            tracing::info!(keys = fetched.len(), "loaded identity signing keys");
            keys.extend(fetched);
        }
        Err(e) => tracing::warn!(error = %e, url = %identity.jwks_url, "failed to fetch signing keys"),
    }
    if let Some(secret) = identity.shared_secret.as_deref().filter(|s| !s.is_empty()) {
        tracing::warn!("shared-secret credentials enabled; do not use in production");
        keys.insert_shared_secret(SHARED_SECRET_KID, secret.as_bytes());
    }
    if keys.is_empty() {
        tracing::warn!("no signing keys available; every protected request will be rejected");
    }
    IdentityVerifier::new(keys)
        .with_issuer(identity.expected_issuer())
        .with_audience(identity.expected_audience())
        .with_leeway(identity.leeway_secs)
}

async fn cmd_status(uid: String, db: Option<PathBuf>) -> Result<()> {
    let manager = offline_manager(db).await?;
    let status = manager
        .connection_status(&uid)
        .await
        .map_err(|e| anyhow::anyhow!("status failed: {e}"))?;
    let label = if status.is_connected() {
        "connected"
    } else {
        "not connected"
    };
    match status.expiry_epoch_millis {
        Some(expiry) => println!("{uid}: {label} ({:?}, expires at {expiry})", status.state),
        None => println!("{uid}: {label} ({:?})", status.state),
    }
    Ok(())
}

async fn cmd_disconnect(uid: String, db: Option<PathBuf>) -> Result<()> {
    let manager = offline_manager(db).await?;
    manager
        .disconnect(&uid)
        .await
        .map_err(|e| anyhow::anyhow!("disconnect failed: {e}"))?;
    eprintln!("{uid} disconnected");
    Ok(())
}

/// A manager for local maintenance commands; it never talks to Google.
async fn offline_manager(db: Option<PathBuf>) -> Result<DelegatedAuthManager> {
    let store = Arc::new(open_store(db).await?);
    let oauth = Arc::new(GoogleOAuthClient::new(rquest::Client::new(), None, None));
    Ok(DelegatedAuthManager::new(store, oauth))
}

async fn open_store(db: Option<PathBuf>) -> Result<SqliteStore> {
    let path = db.unwrap_or_else(default_db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let url = format!("sqlite://{}", path.display());
    SqliteStore::new(&url)
        .await
        .map_err(|e| anyhow::anyhow!("database error: {e}"))
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".letterbox").join("letterbox.db")
}
