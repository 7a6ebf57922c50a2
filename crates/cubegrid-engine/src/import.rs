//! Loading entities into the store from a JSON import file.
//!
//! The file holds whole hierarchies (written with one atomic
//! `update_hierarchy` each), matrices (written as one atomic batch), and
//! the blending-logic and z-axis records they refer to:
//!
//! ```json
//! {
//!   "hierarchies": [{ "cube": {}, "subcubes": [], "subcubeVertices": [], "cubeVertices": [] }],
//!   "matrices": [{ "type": "BackgroundMatrix", "matrix": {} }],
//!   "blendingLogic": [{ "logicId": "soft", "strategy": "BlendVrtxByWeight" }],
//!   "zAxis": [{ "id": "z", "cameraPosition": [0, 0, 0], "userDefinedPoint": [0, 0, 0] }]
//! }
//! ```

use std::path::Path;

use cubegrid_db::{DocumentBackend, EntityStore, HierarchyBundle, MatrixUpdate};
use cubegrid_types::{EntityKind, MatrixKind};
use serde::Deserialize;
use serde_json::Value;

use crate::error::EngineError;

/// Contents of an import file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFile {
    /// Cube subtrees.
    #[serde(default)]
    pub hierarchies: Vec<ImportedHierarchy>,
    /// Matrix documents.
    #[serde(default)]
    pub matrices: Vec<ImportedMatrix>,
    /// `BlendingLogic` documents.
    #[serde(default)]
    pub blending_logic: Vec<Value>,
    /// `ZAxisConfig` documents.
    #[serde(default)]
    pub z_axis: Vec<Value>,
}

/// One cube and its subtree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedHierarchy {
    /// The cube document.
    pub cube: Value,
    /// Subcube documents.
    #[serde(default)]
    pub subcubes: Vec<Value>,
    /// Subcube vertex documents.
    #[serde(default)]
    pub subcube_vertices: Vec<Value>,
    /// Cube vertex documents.
    #[serde(default)]
    pub cube_vertices: Vec<Value>,
}

impl From<ImportedHierarchy> for HierarchyBundle {
    fn from(h: ImportedHierarchy) -> Self {
        Self {
            cube: h.cube,
            subcubes: h.subcubes,
            subcube_vertices: h.subcube_vertices,
            cube_vertices: h.cube_vertices,
        }
    }
}

/// Matrix collection named in an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ImportedMatrixKind {
    /// `CubeMatrix`.
    CubeMatrix,
    /// `SubcubeMatrix`.
    SubcubeMatrix,
    /// `BackgroundMatrix`.
    BackgroundMatrix,
}

impl From<ImportedMatrixKind> for MatrixKind {
    fn from(kind: ImportedMatrixKind) -> Self {
        match kind {
            ImportedMatrixKind::CubeMatrix => Self::Cube,
            ImportedMatrixKind::SubcubeMatrix => Self::Subcube,
            ImportedMatrixKind::BackgroundMatrix => Self::Background,
        }
    }
}

/// A `{type, matrix}` pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportedMatrix {
    /// Target collection.
    #[serde(rename = "type")]
    pub kind: ImportedMatrixKind,
    /// The matrix document.
    pub matrix: Value,
}

/// Counts of what an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Hierarchies committed.
    pub hierarchies: usize,
    /// Documents written by those hierarchies.
    pub hierarchy_documents: usize,
    /// Matrices committed.
    pub matrices: usize,
    /// Blending-logic and z-axis records saved.
    pub settings: usize,
}

/// Read and parse an import file.
pub async fn read(path: &Path) -> Result<ImportFile, EngineError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write everything in `file` to `store`.
///
/// Settings records are saved first so hierarchies can refer to them.
/// Each hierarchy is atomic on its own; an error stops the import, leaving
/// earlier hierarchies committed.
pub async fn apply<B: DocumentBackend>(
    store: &EntityStore<B>,
    file: ImportFile,
) -> Result<ImportSummary, EngineError> {
    let mut summary = ImportSummary::default();

    let settings = file
        .blending_logic
        .into_iter()
        .map(|doc| (EntityKind::BlendingLogic, doc))
        .chain(file.z_axis.into_iter().map(|doc| (EntityKind::ZAxisConfig, doc)));
    for (kind, doc) in settings {
        store.save(doc, kind).await?;
        summary.settings = summary.settings.saturating_add(1);
    }

    for hierarchy in file.hierarchies {
        let written = store.update_hierarchy(hierarchy.into()).await?;
        summary.hierarchies = summary.hierarchies.saturating_add(1);
        summary.hierarchy_documents = summary.hierarchy_documents.saturating_add(written);
    }

    let updates = file
        .matrices
        .into_iter()
        .map(|m| MatrixUpdate::new(m.kind.into(), m.matrix))
        .collect();
    summary.matrices = store.batch_update_matrices(updates).await?;

    tracing::info!(
        hierarchies = summary.hierarchies,
        documents = summary.hierarchy_documents,
        matrices = summary.matrices,
        settings = summary.settings,
        "Import applied"
    );
    Ok(summary)
}
