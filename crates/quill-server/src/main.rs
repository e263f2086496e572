mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use quill_api::auth::{AppState, AppStateInner};
use quill_api::token::TokenCodec;
use quill_db::{Database, migrations};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "quill", about = "Blogging API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Inspect or move the schema revision
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply every pending revision
    Up,
    /// Roll back to a revision, or all the way when none is given
    Down {
        #[arg(long)]
        to: Option<String>,
    },
    /// Print the applied head revision
    Current,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,quill_api=debug,quill_db=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Migrate { action } => migrate(&settings, action),
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let tokens = TokenCodec::new(&settings.token_config()?)?;
    let db = Database::open(&settings.db_path)?;

    let state: AppState = Arc::new(AppStateInner { db, tokens });

    let app = quill_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Quill server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn migrate(settings: &Settings, action: MigrateAction) -> anyhow::Result<()> {
    let mut conn = quill_db::connect(&settings.db_path)?;

    match action {
        MigrateAction::Up => {
            let applied = migrations::upgrade(&mut conn)?;
            info!("Applied {} revision(s)", applied.len());
        }
        MigrateAction::Down { to } => {
            let rolled = migrations::downgrade(&mut conn, to.as_deref())?;
            info!("Rolled back {} revision(s)", rolled.len());
        }
        MigrateAction::Current => match migrations::current(&conn)? {
            Some(rev) => println!("{}", rev),
            None => println!("<base>"),
        },
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
