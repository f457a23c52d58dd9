mod config;
mod db;
mod frame;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use config::{ServerConfig, StoreKind};
use services::exercise::{ExerciseStore, MemoryExerciseStore, PgExerciseStore};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("server io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "codeblocks failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;

    let exercises: Arc<dyn ExerciseStore> = match &config.store {
        StoreKind::Postgres { database_url, max_connections } => {
            let pool = db::init_pool(database_url, *max_connections).await?;
            tracing::info!(max_connections, "exercise store: postgres");
            Arc::new(PgExerciseStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("exercise store: memory, changes are lost on exit");
            Arc::new(MemoryExerciseStore::with_starters())
        }
    };
    let state = state::AppState::new(exercises, config.ws_channel_capacity);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "codeblocks listening");
    axum::serve(listener, app).await?;
    Ok(())
}
