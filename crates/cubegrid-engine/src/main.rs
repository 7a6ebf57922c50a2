//! Cubegrid engine binary.
//!
//! Wires the entity store, blend painter, and spatial index together for
//! one window: loads configuration, opens the configured backend, applies
//! an optional import file, paints the window, and writes the bins.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `cubegrid-config.yaml` (or `CUBEGRID_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the memory or `PostgreSQL` backend
//! 4. Create the store collections and indices
//! 5. Import, paint, and write output
//! 6. Close the backend

mod config;
mod error;
mod import;
mod pipeline;

use cubegrid_db::{
    DocumentBackend, EntityStore, MemoryBackend, PostgresBackend, PostgresConfig, StoreSchema,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{BackendKind, EngineConfig, LoggingConfig};
use crate::error::EngineError;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the backend, or the paint run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so failures here are
    //    reported through the returned error only.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("cubegrid-engine starting");
    if !from_file {
        info!("Config file not found, using defaults");
    }
    info!(
        store = config.store.name,
        version = config.store.version,
        backend = ?config.store.backend,
        window = config.window_uid,
        "Configuration loaded"
    );

    // 3-6. Open the backend and run.
    match config.store.backend {
        BackendKind::Memory => {
            run(&mut EntityStore::new(MemoryBackend::new()), &config).await?;
        }
        BackendKind::Postgres => {
            let pg = PostgresConfig::new(config.store.postgres_url.as_str())
                .with_max_connections(config.store.max_connections);
            let backend = PostgresBackend::connect(&pg).await.map_err(EngineError::from)?;
            info!("PostgreSQL backend connected");
            let mut store = EntityStore::new(backend);
            let result = run(&mut store, &config).await;
            store.backend().close().await;
            result?;
        }
    }

    info!("cubegrid-engine finished");
    Ok(())
}

/// Initialize `store` and run the pipeline.
async fn run<B: DocumentBackend>(
    store: &mut EntityStore<B>,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    store
        .initialize(
            config.store.name.as_str(),
            config.store.version,
            StoreSchema::standard(),
        )
        .await?;

    let report = pipeline::execute(store, config).await?;
    info!(
        window = %report.window_uid,
        entities = report.entities,
        aliases = report.aliases,
        near_subject = report.near_subject,
        cube_bins = report.cube_bins.len(),
        subcube_bins = report.subcube_bins.len(),
        "Run complete"
    );
    Ok(())
}

/// Load configuration from the config path, falling back to defaults when
/// the file does not exist. The flag reports whether a file was read.
fn load_config() -> Result<(EngineConfig, bool), EngineError> {
    let path = EngineConfig::path();
    if path.exists() {
        Ok((EngineConfig::from_file(&path)?, true))
    } else {
        Ok((EngineConfig::parse("")?, false))
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
