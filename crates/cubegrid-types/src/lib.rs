//! Entity and schema model for the cube → subcube → vertex hierarchy.
//!
//! This crate is the single source of truth for the data contracts shared
//! by the entity store, the spatial index, and the blend engine. Types
//! exported with `ts-rs` describe the renderer boundary for `TypeScript`
//! consumers.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe string wrappers for all entity identifiers
//! - [`kind`] -- [`EntityKind`], its collections, and the [`Record`] trait
//! - [`entities`] -- Cubes, subcubes, and their vertices
//! - [`matrix`] -- Cube, subcube, and background color matrices
//! - [`settings`] -- Blending-logic and z-axis records
//! - [`render`] -- Bin keys and cells handed to the renderer

pub mod entities;
pub mod ids;
pub mod kind;
pub mod matrix;
pub mod render;
pub mod settings;

// Re-export all public types at crate root for convenience.
pub use entities::{
    Cube, CubeVertex, PackedVertex, Point3, Rgb, Subcube, SubcubeVertex, VertexRef, VertexValue,
};
pub use ids::{CubeId, LogicId, MatrixId, SubcubeId, VertexId, WindowUid, ZAxisId, origin_id};
pub use kind::{EntityKind, MatrixKind, Record};
pub use matrix::{BackgroundMatrix, CubeMatrix, SubcubeMatrix};
pub use render::{BinCell, BinKey, BinMap, bin_coord};
pub use settings::{BlendingLogic, ZAxisConfig};
