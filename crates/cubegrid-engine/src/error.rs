//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup, import, and painting.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// An entity store operation failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: cubegrid_db::StoreError,
    },

    /// Connecting to the persistent store failed.
    #[error("backend error: {source}")]
    Backend {
        /// The underlying backend error.
        #[from]
        source: cubegrid_db::BackendError,
    },

    /// Painting failed.
    #[error("blend error: {source}")]
    Blend {
        /// The underlying blend error.
        #[from]
        source: cubegrid_blend::BlendError,
    },

    /// Building or querying the spatial index failed.
    #[error("spatial error: {source}")]
    Spatial {
        /// The underlying spatial error.
        #[from]
        source: cubegrid_spatial::SpatialError,
    },

    /// Reading the import file or writing the output file failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The import file or painted output could not be (de)serialized.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
