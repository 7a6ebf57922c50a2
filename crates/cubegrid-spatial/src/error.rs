//! Error types for the `cubegrid-spatial` crate.

use cubegrid_db::StoreError;

/// Errors that can occur while building or querying a spatial index.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The grid was configured with an unusable bin size.
    #[error("bin size must be positive and finite, got {0}")]
    InvalidBinSize(f64),

    /// A query radius was negative or not finite.
    #[error("radius must be non-negative and finite, got {0}")]
    InvalidRadius(f64),

    /// Loading the window snapshot from the entity store failed.
    #[error("failed to load window snapshot: {0}")]
    Store(#[from] StoreError),
}
