//! Type-safe identifier wrappers around [`String`].
//!
//! Every entity in the hierarchy has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. Identifiers are
//! stored as strings, but documents written by older callers may carry
//! numeric ids, so deserialization accepts either form.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

/// Accepts a JSON string or integer and yields its string form.
struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_owned())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdVisitor).map(Self)
            }
        }
    };
}

define_id! {
    /// Identifier of the display window that owns an entity.
    WindowUid
}

define_id! {
    /// Unique identifier for a cube.
    CubeId
}

define_id! {
    /// Unique identifier for a subcube.
    SubcubeId
}

define_id! {
    /// Unique identifier for a cube vertex or subcube vertex.
    VertexId
}

define_id! {
    /// Unique identifier for a cube, subcube, or background matrix.
    MatrixId
}

define_id! {
    /// Identifier of a stored blending-logic record.
    LogicId
}

define_id! {
    /// Identifier of a stored z-axis configuration.
    ZAxisId
}

/// Compose the `originID` of a subcube or subcube vertex.
///
/// The origin id is the plain concatenation of the window uid and the
/// cube id, with no separator.
pub fn origin_id(window_uid: &WindowUid, cube_id: &CubeId) -> String {
    format!("{window_uid}{cube_id}")
}
