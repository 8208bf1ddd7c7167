//! Questions server binary for the Lexicon service.
//!
//! Loads configuration, initializes logging, opens the configured question
//! store, and serves the HTTP API until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lexicon.yaml` (or `LEXICON_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the store: `PostgreSQL` pool (creating the schema if asked) or
//!    the in-memory store
//! 4. Serve the questions API
//! 5. Close the pool on shutdown

mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use lexicon_api::{AppState, ServerConfig, start_server};
use lexicon_db::{MemoryStore, PostgresPool, QuestionStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{
    CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH, LexiconConfig, LogFormat, LoggingConfig, StorageBackend,
};
use crate::error::StartupError;

/// Application entry point for the questions server.
///
/// # Errors
///
/// Returns an error if configuration, store setup, or serving fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path = std::env::var(CONFIG_PATH_VAR)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = LexiconConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;

    info!(
        path = %config_path.display(),
        file_found = config_path.exists(),
        backend = ?config.storage.backend,
        host = config.server.host,
        port = config.server.port,
        "lexicon-server starting"
    );

    // 3-5. Open the store and serve.
    run(&config).await.context("lexicon-server failed")?;

    info!("lexicon-server shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| StartupError::Logging {
            message: format!("invalid log filter {:?}: {e}", logging.level),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| StartupError::Logging {
        message: e.to_string(),
    })
}

async fn run(config: &LexiconConfig) -> Result<(), StartupError> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = PostgresPool::connect(&config.database.pool_config()).await?;
            if config.database.ensure_schema {
                pool.ensure_schema().await?;
                info!("Database schema ready");
            }

            let served = serve(&config.server, pool.question_store()).await;
            pool.close().await;
            served
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; questions are lost on exit");
            serve(&config.server, MemoryStore::new()).await
        }
    }
}

async fn serve<S: QuestionStore>(server: &ServerConfig, store: S) -> Result<(), StartupError> {
    let state = Arc::new(AppState::new(store));
    start_server(server, state).await?;
    Ok(())
}
