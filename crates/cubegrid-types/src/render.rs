//! The renderer boundary: bin keys and composited bin cells.
//!
//! The blend engine hands a [`BinMap`] to the external renderer. Keys
//! serialize as `"row,col"` (flat) or `"row,col,depth"` (background).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use ts_rs::TS;

use crate::entities::Rgb;

/// Grid coordinates of a painted bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinKey {
    /// `floor(x / binSize)`.
    pub row: i64,
    /// `floor(y / binSize)`.
    pub col: i64,
    /// `floor(z / binSize)`; `None` when depth is collapsed.
    pub depth: Option<i64>,
}

impl BinKey {
    /// A key with the depth axis collapsed.
    pub const fn flat(row: i64, col: i64) -> Self {
        Self {
            row,
            col,
            depth: None,
        }
    }

    /// A key that keeps the depth axis.
    pub const fn layered(row: i64, col: i64, depth: i64) -> Self {
        Self {
            row,
            col,
            depth: Some(depth),
        }
    }
}

impl core::fmt::Display for BinKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.depth {
            Some(depth) => write!(f, "{},{},{depth}", self.row, self.col),
            None => write!(f, "{},{}", self.row, self.col),
        }
    }
}

impl Serialize for BinKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The composited state of one bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BinCell {
    /// Composited color, not clamped unless the strategy clamps.
    pub color: Rgb,
    /// Whether any vertex contributed to this bin.
    pub active: bool,
    /// Depth of the first vertex, or the deepest one for background bins.
    pub depth: f64,
}

/// Bin key to composited color, in key order.
pub type BinMap = BTreeMap<BinKey, BinCell>;

/// Grid coordinate of `coord` on an axis divided into `bin_size` cells.
///
/// Out-of-range quotients saturate at the `i64` bounds.
#[allow(clippy::cast_possible_truncation)]
pub fn bin_coord(coord: f64, bin_size: f64) -> i64 {
    (coord / bin_size).floor() as i64
}
