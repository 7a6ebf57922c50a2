//! Blending-logic and z-axis records.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entities::Point3;
use crate::ids::{LogicId, ZAxisId};
use crate::kind::{EntityKind, Record};

/// A stored alias from a blending-logic id to a built-in blend strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct BlendingLogic {
    /// Identifier referenced by `blendingLogicId` fields.
    pub logic_id: LogicId,
    /// Name of the built-in strategy this id resolves to.
    pub strategy: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Record for BlendingLogic {
    const KIND: EntityKind = EntityKind::BlendingLogic;

    fn key(&self) -> String {
        self.logic_id.to_string()
    }
}

/// Camera position and user-defined subject point for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ZAxisConfig {
    /// Record id.
    pub id: ZAxisId,
    /// Camera position.
    pub camera_position: Point3,
    /// Subject point used by proximity blending.
    pub user_defined_point: Point3,
}

impl Record for ZAxisConfig {
    const KIND: EntityKind = EntityKind::ZAxisConfig;

    fn key(&self) -> String {
        self.id.to_string()
    }
}
