//! Color-layer matrices for cubes, subcubes, and the background.
//!
//! Layer lengths and `binData` shape are caller-defined; nothing here
//! cross-checks a layer against the bins it describes. Bins are usually
//! `{row, col, depth, value}` objects, but 2D bins omit `depth` and callers
//! may add fields, so they are kept as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::entities::Rgb;
use crate::ids::{CubeId, MatrixId, WindowUid};
use crate::kind::{EntityKind, Record};

/// Color layers for a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CubeMatrix {
    /// Matrix id.
    pub id: MatrixId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Red channel layer.
    pub red_layer: Vec<f64>,
    /// Green channel layer.
    pub green_layer: Vec<f64>,
    /// Blue channel layer.
    pub blue_layer: Vec<f64>,
    /// Per-bin values, shaped by the caller.
    pub bin_data: Vec<Value>,
}

impl Record for CubeMatrix {
    const KIND: EntityKind = EntityKind::CubeMatrix;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Color layers for a subcube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SubcubeMatrix {
    /// Matrix id.
    pub id: MatrixId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Cube the subcube belongs to.
    pub cube_id: CubeId,
    /// Red channel layer.
    pub red_layer: Vec<f64>,
    /// Green channel layer.
    pub green_layer: Vec<f64>,
    /// Blue channel layer.
    pub blue_layer: Vec<f64>,
    /// Per-bin values, shaped by the caller.
    pub bin_data: Vec<Value>,
}

impl Record for SubcubeMatrix {
    const KIND: EntityKind = EntityKind::SubcubeMatrix;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Color layers for the background, plus its ambient baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct BackgroundMatrix {
    /// Matrix id.
    pub id: MatrixId,
    /// Owning window.
    #[serde(rename = "windowUID")]
    pub window_uid: WindowUid,
    /// Red channel layer.
    pub red_layer: Vec<f64>,
    /// Green channel layer.
    pub green_layer: Vec<f64>,
    /// Blue channel layer.
    pub blue_layer: Vec<f64>,
    /// Per-bin values, shaped by the caller.
    pub bin_data: Vec<Value>,
    /// Baseline color added by every blend.
    pub ambient_value: Rgb,
    /// Blend strategy used for the background.
    pub blending_logic_id: String,
}

impl Record for BackgroundMatrix {
    const KIND: EntityKind = EntityKind::BackgroundMatrix;

    fn key(&self) -> String {
        self.id.to_string()
    }
}
