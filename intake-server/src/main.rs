//! intake-server - Form submission intake
//!
//! Accepts paper, partner and bootcamp form submissions on `POST /submit`,
//! uploads attached files to Google Drive and appends one row per
//! submission to the matching Google Sheets tab.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use intake_common::config::{load_toml_config, ConfigOverrides, IntakeConfig};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intake_server::google::{self, DriveClient, ServiceAccountKey, SheetsClient, TokenProvider};
use intake_server::staging::StagingArea;
use intake_server::{build_router, AppState};

/// Command-line arguments for intake-server
#[derive(Parser, Debug)]
#[command(name = "intake-server")]
#[command(about = "Form submission intake backed by Google Drive and Google Sheets")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "INTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Google service-account JSON key
    #[arg(long, env = "GOOGLE_KEY_FILE")]
    google_key_file: Option<PathBuf>,

    /// Destination spreadsheet identifier
    #[arg(long, env = "SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// Drive folder receiving uploads
    #[arg(long, env = "GDRIVE_FOLDER_ID")]
    drive_folder_id: Option<String>,

    /// Comma-separated CORS origins
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Option<Vec<String>>,

    /// Address to bind
    #[arg(long, env = "INTAKE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "INTAKE_PORT")]
    port: Option<u16>,

    /// Directory for staged uploads
    #[arg(long, env = "INTAKE_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_path: args.config,
            google_key_file: args.google_key_file,
            spreadsheet_id: args.spreadsheet_id,
            drive_folder_id: args.drive_folder_id,
            allowed_origins: args.allowed_origins,
            host: args.host,
            port: args.port,
            upload_dir: args.upload_dir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // TOML is read before tracing exists because it carries the log level
    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration file")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting intake-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = IntakeConfig::resolve(args.into(), toml_config).context("Invalid configuration")?;

    let staging = StagingArea::create(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    info!("Staging uploads in {}", staging.dir().display());

    // Collaborators are built once and shared by every request
    let key = ServiceAccountKey::from_file(&config.google_key_file)
        .await
        .context("Failed to load Google credentials")?;
    let http = reqwest::Client::builder()
        .user_agent(google::USER_AGENT)
        .timeout(Duration::from_secs(120))
        .build()
        .context("Failed to build HTTP client")?;
    let auth = Arc::new(TokenProvider::new(http.clone(), key, google::SCOPES)?);
    let drive = DriveClient::new(http.clone(), auth.clone(), config.drive_folder_id.clone());
    let sheets = SheetsClient::new(http, auth, config.spreadsheet_id.clone());
    info!("Drive folder: {}", drive.folder_id());

    if config.allows_any_origin() {
        info!("CORS: any origin");
    } else {
        info!("CORS: {}", config.allowed_origins.join(", "));
    }

    let state = AppState::new(Arc::new(drive), Arc::new(sheets), staging)
        .with_allowed_origins(config.allowed_origins.clone())
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
