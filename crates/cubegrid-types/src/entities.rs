//! The cube → subcube → vertex hierarchy.
//!
//! Field names follow the persisted document layout (`windowUID`,
//! `originID`, `subCubeID`, ...), so a record serializes directly into
//! the document the entity store validates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{CubeId, SubcubeId, VertexId, WindowUid, origin_id};
use crate::kind::{EntityKind, Record};

/// A point `[x, y, z]`; `z` is the depth scalar.
pub type Point3 = [f64; 3];

/// A color `[r, g, b]`. Stored vertex colors have channels in `[0, 255]`.
pub type Rgb = [f64; 3];

/// The packed value carried by every vertex:
/// `[color, position, weight, proximityStrategyId]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VertexValue(pub Rgb, pub Point3, pub f64, pub String);

impl VertexValue {
    /// Build a packed vertex value.
    pub fn new(color: Rgb, position: Point3, weight: f64, proximity: impl Into<String>) -> Self {
        Self(color, position, weight, proximity.into())
    }

    /// The vertex color.
    pub const fn color(&self) -> Rgb {
        self.0
    }

    /// The vertex position.
    pub const fn position(&self) -> Point3 {
        self.1
    }

    /// The blend weight.
    pub const fn weight(&self) -> f64 {
        self.2
    }

    /// The proximity strategy identifier (not checked against any registry).
    pub fn proximity_strategy(&self) -> &str {
        &self.3
    }

    /// The derived proximity padding, `|weight|`.
    pub const fn padding(&self) -> f64 {
        self.2.abs()
    }
}

/// A leaf vertex of a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CubeVertex {
    /// Unique vertex id.
    #[serde(rename = "vertexID")]
    pub vertex_id: VertexId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Window currently displaying the vertex, if any.
    #[serde(rename = "activeWindowUID", default)]
    pub active_window_uid: Option<WindowUid>,
    /// Packed `[color, position, weight, proximityStrategyId]`.
    pub value_array: VertexValue,
    /// Blend strategy used when painting this vertex.
    pub blending_logic_id: String,
    /// Derived: always `|weight|`, recomputed on every validated write.
    #[serde(default)]
    pub proximity_padding: f64,
}

impl CubeVertex {
    /// Create a cube vertex with its derived padding populated.
    pub fn new(
        vertex_id: VertexId,
        window_uid: WindowUid,
        value_array: VertexValue,
        blending_logic_id: impl Into<String>,
    ) -> Self {
        let proximity_padding = value_array.padding();
        Self {
            vertex_id,
            window_uid,
            active_window_uid: None,
            value_array,
            blending_logic_id: blending_logic_id.into(),
            proximity_padding,
        }
    }
}

impl Record for CubeVertex {
    const KIND: EntityKind = EntityKind::CubeVertex;

    fn key(&self) -> String {
        self.vertex_id.to_string()
    }
}

/// A `[position, color]` pair owned by value by its cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PackedVertex(pub Point3, pub Rgb);

/// A top-level cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Cube {
    /// Unique cube id.
    pub id: CubeId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Window currently displaying the cube, if any.
    #[serde(rename = "activeWindowUID", default)]
    pub active_window_uid: Option<WindowUid>,
    /// Cube center.
    pub position: Point3,
    /// Ordered ids of the cube's subcubes.
    #[serde(rename = "subcubeIDs")]
    pub subcube_ids: Vec<SubcubeId>,
    /// The cube's vertices, packed by value.
    pub vertices: Vec<PackedVertex>,
    /// Blend strategy used for this cube.
    pub blending_logic_id: String,
}

impl Record for Cube {
    const KIND: EntityKind = EntityKind::Cube;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// A `(vertexID, blendingLogicId)` pair in a subcube's `vertexArray`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VertexRef(pub VertexId, pub String);

/// A subcube of a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Subcube {
    /// Unique subcube id.
    pub id: SubcubeId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Window currently displaying the subcube, if any.
    #[serde(rename = "activeWindowUID", default)]
    pub active_window_uid: Option<WindowUid>,
    /// Subcube center.
    pub center: Point3,
    /// Position of the subcube among its siblings.
    pub order: i64,
    /// Ordered vertex references.
    pub vertex_array: Vec<VertexRef>,
    /// Parent cube.
    pub cube_id: CubeId,
    /// Must equal `windowUID` followed by `cubeId`.
    #[serde(rename = "originID")]
    pub origin_id: String,
    /// Blend strategy used for this subcube.
    pub blending_logic_id: String,
}

impl Subcube {
    /// Create an empty subcube with a consistent `originID`.
    pub fn new(
        id: SubcubeId,
        window_uid: WindowUid,
        cube_id: CubeId,
        center: Point3,
        order: i64,
    ) -> Self {
        let origin_id = origin_id(&window_uid, &cube_id);
        Self {
            id,
            window_uid,
            active_window_uid: None,
            center,
            order,
            vertex_array: Vec::new(),
            cube_id,
            origin_id,
            blending_logic_id: String::new(),
        }
    }
}

impl Record for Subcube {
    const KIND: EntityKind = EntityKind::Subcube;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// A vertex of a subcube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SubcubeVertex {
    /// Unique vertex id.
    pub id: VertexId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Cube the owning subcube belongs to.
    pub cube_id: CubeId,
    /// Owning subcube.
    #[serde(rename = "subCubeID")]
    pub sub_cube_id: SubcubeId,
    /// Must equal `windowUID` followed by `cubeId`.
    #[serde(rename = "originID")]
    pub origin_id: String,
    /// Packed `[color, position, weight, proximityStrategyId]`.
    pub value: VertexValue,
    /// Window currently displaying the vertex, if any.
    #[serde(rename = "activeWindowUID", default)]
    pub active_window_uid: Option<WindowUid>,
    /// Derived: always `|weight|`, recomputed on every validated write.
    #[serde(default)]
    pub proximity_padding: f64,
}

impl SubcubeVertex {
    /// Create a subcube vertex with a consistent `originID` and padding.
    pub fn new(
        id: VertexId,
        window_uid: WindowUid,
        cube_id: CubeId,
        sub_cube_id: SubcubeId,
        value: VertexValue,
    ) -> Self {
        let origin_id = origin_id(&window_uid, &cube_id);
        let proximity_padding = value.padding();
        Self {
            id,
            window_uid,
            cube_id,
            sub_cube_id,
            origin_id,
            value,
            active_window_uid: None,
            proximity_padding,
        }
    }

    /// Replace the weight, keeping the derived padding in step.
    pub const fn set_weight(&mut self, weight: f64) {
        self.value.2 = weight;
        self.proximity_padding = weight.abs();
    }
}

impl Record for SubcubeVertex {
    const KIND: EntityKind = EntityKind::SubcubeVertex;

    fn key(&self) -> String {
        self.id.to_string()
    }
}
