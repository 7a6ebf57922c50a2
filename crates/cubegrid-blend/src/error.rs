//! Error types for the `cubegrid-blend` crate.

/// Errors that can occur while blending or painting bins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlendError {
    /// A distance-based strategy was resolved but no distance was supplied.
    #[error("strategy {strategy} needs a distance to a subject point, none was supplied")]
    MissingDistance {
        /// Name of the strategy that required the distance.
        strategy: &'static str,
    },

    /// The painter was configured with an unusable bin size.
    #[error("bin size must be positive and finite, got {0}")]
    InvalidBinSize(f64),
}
