//! `riverdata-server`: serves offices, locations, rating templates and water
//! users in negotiated formats.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! riverdata-server
//!
//! # Persistent SQLite server, seeded on start-up:
//! RIVERDATA_DB=./data.db RIVERDATA_SEED=./seed.json riverdata-server
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig`](riverdata_server::ServerConfig) for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use riverdata::FormatRegistry;
use riverdata_server::{build_router, MemoryStorage, SeedDocument, ServerConfig, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riverdata_server=info,riverdata=info,tower_http=debug".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(
                SqliteStorage::open(path)
                    .map_err(|e| format!("failed to open SQLite database at {path}: {e}"))?,
            )
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    if let Some(seed) = &config.seed_path {
        tracing::info!("seeding from {seed}");
        SeedDocument::from_path(seed)?.load(storage.as_ref()).await?;
    }

    let registry = Arc::new(FormatRegistry::standard()?);
    let app = build_router(storage, registry, config.clone());

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.bind_addr))?;

    axum::serve(listener, app).await?;
    Ok(())
}
