//! Uniform-grid spatial index for the cube hierarchy.
//!
//! The index is a rebuildable snapshot of one window: it never observes
//! later store writes. Rebuild it before querying when freshness matters.
//!
//! # Modules
//!
//! - [`grid`] -- [`SpatialIndex`], cell keys, and radius queries
//! - [`error`] -- Error types

pub mod error;
pub mod grid;

pub use error::SpatialError;
pub use grid::{Cell, CellKey, Nearby, SpatialIndex};
