//! Entity kinds, their backing collections, and the [`Record`] trait.
//!
//! Each [`EntityKind`] maps to exactly one named collection in the
//! persistent store. The collection names and key fields match the
//! document layout written by the entity store.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// The kinds of entity persisted by the entity store.
///
/// Every kind is backed by one named collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// A top-level cube (`Cubes`).
    Cube,
    /// A leaf vertex of a cube (`CubeVertices`).
    CubeVertex,
    /// A subcube of a cube (`Subcubes`).
    Subcube,
    /// A vertex of a subcube (`SubcubeVertices`).
    SubcubeVertex,
    /// Color layers for a cube (`CubeMatrix`).
    CubeMatrix,
    /// Color layers for a subcube (`SubcubeMatrix`).
    SubcubeMatrix,
    /// Color layers for the background (`BackgroundMatrix`).
    BackgroundMatrix,
    /// A named blending-logic record (`BlendingLogic`).
    BlendingLogic,
    /// Camera and subject point configuration (`ZAxisConfig`).
    ZAxisConfig,
}

impl EntityKind {
    /// All entity kinds, in collection creation order.
    pub const ALL: [Self; 9] = [
        Self::Cube,
        Self::CubeVertex,
        Self::Subcube,
        Self::SubcubeVertex,
        Self::CubeMatrix,
        Self::SubcubeMatrix,
        Self::BackgroundMatrix,
        Self::BlendingLogic,
        Self::ZAxisConfig,
    ];

    /// Name of the collection backing this kind.
    pub const fn collection_name(self) -> &'static str {
        match self {
            Self::Cube => "Cubes",
            Self::CubeVertex => "CubeVertices",
            Self::Subcube => "Subcubes",
            Self::SubcubeVertex => "SubcubeVertices",
            Self::CubeMatrix => "CubeMatrix",
            Self::SubcubeMatrix => "SubcubeMatrix",
            Self::BackgroundMatrix => "BackgroundMatrix",
            Self::BlendingLogic => "BlendingLogic",
            Self::ZAxisConfig => "ZAxisConfig",
        }
    }

    /// Document field holding the primary key.
    pub const fn key_field(self) -> &'static str {
        match self {
            Self::CubeVertex => "vertexID",
            Self::BlendingLogic => "logicId",
            Self::Cube
            | Self::Subcube
            | Self::SubcubeVertex
            | Self::CubeMatrix
            | Self::SubcubeMatrix
            | Self::BackgroundMatrix
            | Self::ZAxisConfig => "id",
        }
    }

    /// Whether documents of this kind carry an `originID` that must equal
    /// `windowUID` followed by `cubeId`.
    pub const fn has_origin(self) -> bool {
        matches!(self, Self::Subcube | Self::SubcubeVertex)
    }

    /// Look up a kind by its collection name.
    pub fn from_collection_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection_name() == name)
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// The three matrix variants accepted by a batch matrix update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatrixKind {
    /// Targets the `CubeMatrix` collection.
    Cube,
    /// Targets the `SubcubeMatrix` collection.
    Subcube,
    /// Targets the `BackgroundMatrix` collection.
    Background,
}

impl MatrixKind {
    /// The entity kind (and therefore collection) this matrix variant targets.
    pub const fn entity_kind(self) -> EntityKind {
        match self {
            Self::Cube => EntityKind::CubeMatrix,
            Self::Subcube => EntityKind::SubcubeMatrix,
            Self::Background => EntityKind::BackgroundMatrix,
        }
    }
}

/// A typed entity that can be persisted as a document.
///
/// The serialized form of a record is the document the store validates
/// and writes; [`Record::key`] must agree with the field named by
/// [`EntityKind::key_field`].
pub trait Record: Serialize + DeserializeOwned {
    /// The kind (and collection) this record belongs to.
    const KIND: EntityKind;

    /// The primary key of this record.
    fn key(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_collection_name(kind.collection_name()), Some(kind));
        }
        assert_eq!(EntityKind::from_collection_name("Nope"), None);
    }

    #[test]
    fn only_subcube_kinds_carry_origin() {
        let with_origin: Vec<EntityKind> =
            EntityKind::ALL.into_iter().filter(|k| k.has_origin()).collect();
        assert_eq!(with_origin, vec![EntityKind::Subcube, EntityKind::SubcubeVertex]);
    }

    #[test]
    fn matrix_kinds_target_matrix_collections() {
        assert_eq!(MatrixKind::Cube.entity_kind().collection_name(), "CubeMatrix");
        assert_eq!(MatrixKind::Subcube.entity_kind().collection_name(), "SubcubeMatrix");
        assert_eq!(MatrixKind::Background.entity_kind().collection_name(), "BackgroundMatrix");
    }
}
