use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bukukas::api::{self, AppState};
use bukukas::config::{CliArgs, Config};
use bukukas::engine::LedgerEngine;
use bukukas_core::StorageBackend;
use bukukas_memory::InMemoryStorage;
use bukukas_sqlite::SqliteStorage;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let storage: Arc<dyn StorageBackend> = match config.storage.backend.as_str() {
        "sqlite" => {
            let storage = SqliteStorage::new(&config.storage.path)
                .expect("Failed to open sqlite database");
            tracing::info!(path = %config.storage.path, "Using sqlite storage");
            Arc::new(storage)
        }
        "memory" => {
            tracing::info!("Using in-memory storage (state is lost on restart)");
            Arc::new(InMemoryStorage::new())
        }
        other => {
            eprintln!("Unknown storage backend: {}", other);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        engine: LedgerEngine::new(storage),
    });
    let app = api::router(state, Arc::new(config.auth.clone()));

    let addr = config.listen_addr();
    tracing::info!(%addr, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("Server failed");
}
