//! Blend strategies and the bin painter.
//!
//! The painter projects vertex colors into a grid of bins and composites
//! them with strategies looked up by identifier. The resulting
//! [`BinMap`](cubegrid_types::BinMap) is handed to the external renderer.
//!
//! # Modules
//!
//! - [`strategy`] -- The closed set of built-in blend functions
//! - [`registry`] -- Identifier to strategy lookup with silent fallback
//! - [`painter`] -- Binning and per-bin compositing
//! - [`error`] -- Error types

pub mod error;
pub mod painter;
pub mod registry;
pub mod strategy;

pub use error::BlendError;
pub use painter::{PaintEntity, PaintVertex, Painter, PainterConfig, find_farthest_depth};
pub use registry::BlendRegistry;
pub use strategy::{BACKGROUND, BlendParams, BlendStrategy, CORNER_PROXIMITY, WEIGHTED_VERTEX};
