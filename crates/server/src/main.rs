use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod approval;
mod config;
mod db;
mod delivery;
mod error;
mod gate;
mod pipeline;
mod routes;
mod signature;
mod state;
mod translate;

#[cfg(test)]
mod testing;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "hotline-server", about = "Multilingual SMS hotline for volunteer coordinators")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Approve an existing volunteer and grant admin rights
    PromoteAdmin {
        /// Email the volunteer registered with
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotline_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let config = config::Config::load(args.config.as_deref())?;

    // Initialize database
    let db = db::Database::new(&config.database.path).await?;
    db.run_migrations().await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, config).await,
        Command::PromoteAdmin { email } => {
            let volunteer = db.promote_admin(&email.trim().to_lowercase()).await?;
            tracing::info!("{} ({}) is now an approved admin", volunteer.email, volunteer.id);
            Ok(())
        }
    }
}

async fn serve(db: db::Database, config: config::Config) -> Result<()> {
    tracing::info!("Starting hotline server on {}:{}", config.server.host, config.server.port);

    // Create app state
    let state = AppState::new(db, config.clone())?;

    // Build router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
