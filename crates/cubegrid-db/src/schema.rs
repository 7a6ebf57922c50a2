//! Collections and secondary indices.
//!
//! | Collection | Secondary indices |
//! |---|---|
//! | `Cubes` | windowUID, activeWindowUID, blendingLogicId |
//! | `CubeVertices` | windowUID, activeWindowUID |
//! | `Subcubes` | cubeId, windowUID, activeWindowUID, originID, blendingLogicId |
//! | `SubcubeVertices` | cubeId, subCubeID, originID, windowUID, activeWindowUID, proximityPadding, weight, proximity |
//! | `CubeMatrix` | windowUID, redLayer, greenLayer, blueLayer, binData |
//! | `SubcubeMatrix` | the `CubeMatrix` set plus cubeId |
//! | `BackgroundMatrix` | the `CubeMatrix` set plus ambientValue, blendingLogicId |
//! | `BlendingLogic` | none (keyed by `logicId`) |
//! | `ZAxisConfig` | cameraPosition, userDefinedPoint |
//!
//! `weight` and `proximity` are nested: they index elements 2 and 3 of a
//! subcube vertex's `value` tuple.

use cubegrid_types::EntityKind;
use serde_json::Value;

/// A secondary index over a dotted key path into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    /// Name used by index queries.
    pub name: &'static str,
    /// Dotted path to the indexed value; numeric segments index arrays.
    pub key_path: &'static str,
}

impl IndexSpec {
    /// An index whose name equals its top-level field.
    pub const fn field(name: &'static str) -> Self {
        Self {
            name,
            key_path: name,
        }
    }

    /// An index over a nested key path.
    pub const fn nested(name: &'static str, key_path: &'static str) -> Self {
        Self { name, key_path }
    }

    /// The key path split into segments.
    pub fn segments(&self) -> impl Iterator<Item = &'static str> {
        self.key_path.split('.')
    }

    /// The indexed value of `document`, if present and not null.
    pub fn extract<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for segment in self.segments() {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        (!current.is_null()).then_some(current)
    }
}

/// A collection and its secondary indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// The entity kind stored in this collection.
    pub kind: EntityKind,
    /// Secondary indices.
    pub indices: Vec<IndexSpec>,
}

impl CollectionSpec {
    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indices.iter().find(|i| i.name == name)
    }
}

/// The full set of collections the store creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    /// One entry per collection.
    pub collections: Vec<CollectionSpec>,
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self::standard()
    }
}

const MATRIX_INDICES: [IndexSpec; 5] = [
    IndexSpec::field("windowUID"),
    IndexSpec::field("redLayer"),
    IndexSpec::field("greenLayer"),
    IndexSpec::field("blueLayer"),
    IndexSpec::field("binData"),
];

impl StoreSchema {
    /// The standard schema covering every [`EntityKind`].
    pub fn standard() -> Self {
        let spec = |kind, indices: &[IndexSpec]| CollectionSpec {
            kind,
            indices: indices.to_vec(),
        };
        let with_matrix = |extra: &[IndexSpec]| {
            let mut indices = MATRIX_INDICES.to_vec();
            indices.extend_from_slice(extra);
            indices
        };

        Self {
            collections: vec![
                spec(
                    EntityKind::Cube,
                    &[
                        IndexSpec::field("windowUID"),
                        IndexSpec::field("activeWindowUID"),
                        IndexSpec::field("blendingLogicId"),
                    ],
                ),
                spec(
                    EntityKind::CubeVertex,
                    &[IndexSpec::field("windowUID"), IndexSpec::field("activeWindowUID")],
                ),
                spec(
                    EntityKind::Subcube,
                    &[
                        IndexSpec::field("cubeId"),
                        IndexSpec::field("windowUID"),
                        IndexSpec::field("activeWindowUID"),
                        IndexSpec::field("originID"),
                        IndexSpec::field("blendingLogicId"),
                    ],
                ),
                spec(
                    EntityKind::SubcubeVertex,
                    &[
                        IndexSpec::field("cubeId"),
                        IndexSpec::field("subCubeID"),
                        IndexSpec::field("originID"),
                        IndexSpec::field("windowUID"),
                        IndexSpec::field("activeWindowUID"),
                        IndexSpec::field("proximityPadding"),
                        IndexSpec::nested("weight", "value.2"),
                        IndexSpec::nested("proximity", "value.3"),
                    ],
                ),
                spec(EntityKind::CubeMatrix, &MATRIX_INDICES),
                CollectionSpec {
                    kind: EntityKind::SubcubeMatrix,
                    indices: with_matrix(&[IndexSpec::field("cubeId")]),
                },
                CollectionSpec {
                    kind: EntityKind::BackgroundMatrix,
                    indices: with_matrix(&[
                        IndexSpec::field("ambientValue"),
                        IndexSpec::field("blendingLogicId"),
                    ]),
                },
                spec(EntityKind::BlendingLogic, &[]),
                spec(
                    EntityKind::ZAxisConfig,
                    &[IndexSpec::field("cameraPosition"), IndexSpec::field("userDefinedPoint")],
                ),
            ],
        }
    }

    /// The spec of the collection backing `kind`.
    pub fn collection(&self, kind: EntityKind) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.kind == kind)
    }

    /// The first entity kind this schema has no collection for.
    pub fn first_missing(&self) -> Option<EntityKind> {
        EntityKind::ALL.into_iter().find(|k| self.collection(*k).is_none())
    }
}
