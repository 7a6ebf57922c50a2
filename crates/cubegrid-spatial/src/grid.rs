//! Uniform-grid spatial index with radius queries.
//!
//! Every entity is placed in exactly one cell,
//! `(floor(x / binSize), floor(y / binSize), floor(z / binSize))`, using
//! the cube `position`, the subcube `center`, or the subcube vertex
//! position (`value[1]`). A radius query visits the cube-shaped block of
//! cells that can contain a match and keeps only candidates whose exact
//! Euclidean distance is within the radius.

use std::collections::BTreeMap;

use cubegrid_db::{DocumentBackend, EntityStore, WindowSnapshot};
use cubegrid_types::{Cube, Point3, Subcube, SubcubeVertex, WindowUid, bin_coord};

use crate::error::SpatialError;

// =============================================================================
// Cells
// =============================================================================

/// Integer grid coordinates of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey(pub i64, pub i64, pub i64);

impl CellKey {
    /// The cell containing `point` on a grid of `bin_size` cells.
    pub fn of(point: Point3, bin_size: f64) -> Self {
        let [x, y, z] = point;
        Self(
            bin_coord(x, bin_size),
            bin_coord(y, bin_size),
            bin_coord(z, bin_size),
        )
    }

    /// Whether `self` lies in the block of cells at most `reach` cells
    /// from `center` along every axis.
    const fn within(self, center: Self, reach: u64) -> bool {
        self.0.abs_diff(center.0) <= reach
            && self.1.abs_diff(center.1) <= reach
            && self.2.abs_diff(center.2) <= reach
    }

    /// Every cell in the block of side `2 * reach + 1` around `self`.
    fn neighbourhood(self, reach: u64) -> impl Iterator<Item = Self> {
        let span =
            move |c: i64| c.saturating_sub_unsigned(reach)..=c.saturating_add_unsigned(reach);
        let Self(cx, cy, cz) = self;
        span(cx).flat_map(move |x| {
            span(cy).flat_map(move |y| span(cz).map(move |z| Self(x, y, z)))
        })
    }
}

/// The entities placed in one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Cubes whose `position` falls in the cell.
    pub cubes: Vec<Cube>,
    /// Subcubes whose `center` falls in the cell.
    pub subcubes: Vec<Subcube>,
    /// Subcube vertices whose position falls in the cell.
    pub subcube_vertices: Vec<SubcubeVertex>,
}

/// Entities returned by a radius query, borrowed from the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nearby<'a> {
    /// Matching cubes.
    pub cubes: Vec<&'a Cube>,
    /// Matching subcubes.
    pub subcubes: Vec<&'a Subcube>,
    /// Matching subcube vertices.
    pub subcube_vertices: Vec<&'a SubcubeVertex>,
}

impl Nearby<'_> {
    /// Total number of matches.
    pub fn len(&self) -> usize {
        self.cubes
            .len()
            .saturating_add(self.subcubes.len())
            .saturating_add(self.subcube_vertices.len())
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Index
// =============================================================================

/// A uniform-grid snapshot of one window's cubes, subcubes, and subcube
/// vertices.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    window_uid: WindowUid,
    bin_size: f64,
    cells: BTreeMap<CellKey, Cell>,
    len: usize,
}

impl SpatialIndex {
    /// Load every entity of `window_uid` from `store` and index it.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidBinSize`] before touching the store if
    /// `bin_size` is not positive and finite, or [`SpatialError::Store`] if
    /// the snapshot query fails.
    pub async fn build<B: DocumentBackend>(
        store: &EntityStore<B>,
        window_uid: &WindowUid,
        bin_size: f64,
    ) -> Result<Self, SpatialError> {
        check_bin_size(bin_size)?;
        let snapshot = store.window_snapshot(window_uid).await?;
        Self::from_snapshot(snapshot, bin_size)
    }

    /// Index an already loaded snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidBinSize`] if `bin_size` is not
    /// positive and finite.
    pub fn from_snapshot(snapshot: WindowSnapshot, bin_size: f64) -> Result<Self, SpatialError> {
        check_bin_size(bin_size)?;

        let mut cells: BTreeMap<CellKey, Cell> = BTreeMap::new();
        let mut len = 0_usize;

        for cube in snapshot.cubes {
            let key = CellKey::of(cube.position, bin_size);
            cells.entry(key).or_default().cubes.push(cube);
            len = len.saturating_add(1);
        }
        for subcube in snapshot.subcubes {
            let key = CellKey::of(subcube.center, bin_size);
            cells.entry(key).or_default().subcubes.push(subcube);
            len = len.saturating_add(1);
        }
        for vertex in snapshot.subcube_vertices {
            let key = CellKey::of(vertex.value.position(), bin_size);
            cells.entry(key).or_default().subcube_vertices.push(vertex);
            len = len.saturating_add(1);
        }

        tracing::info!(
            window = %snapshot.window_uid,
            bin_size,
            entities = len,
            cells = cells.len(),
            "Spatial index built"
        );

        Ok(Self {
            window_uid: snapshot.window_uid,
            bin_size,
            cells,
            len,
        })
    }

    /// The window this index was built for.
    pub const fn window_uid(&self) -> &WindowUid {
        &self.window_uid
    }

    /// Edge length of a cell.
    pub const fn bin_size(&self) -> f64 {
        self.bin_size
    }

    /// Number of indexed entities.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entities.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The cell containing `point`.
    pub fn cell_key(&self, point: Point3) -> CellKey {
        CellKey::of(point, self.bin_size)
    }

    /// The entities of one cell, if it is occupied.
    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(&key)
    }

    /// Every indexed entity whose Euclidean distance to `point` is at most
    /// `radius` (inclusive).
    ///
    /// Matches are grouped by kind and ordered by cell key, then by
    /// insertion order within a cell.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidRadius`] if `radius` is negative or
    /// not finite.
    pub fn query_near_position(
        &self,
        point: Point3,
        radius: f64,
    ) -> Result<Nearby<'_>, SpatialError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(SpatialError::InvalidRadius(radius));
        }

        let center = self.cell_key(point);
        let reach = radius_in_bins(radius, self.bin_size);
        let mut nearby = Nearby::default();

        // Visit the neighbourhood directly while it is smaller than the set
        // of occupied cells; otherwise filter the occupied cells.
        let block = reach
            .checked_mul(2)
            .and_then(|d| d.checked_add(1))
            .and_then(|side| side.checked_pow(3));
        let occupied = u64::try_from(self.cells.len()).unwrap_or(u64::MAX);

        if block.is_some_and(|cells| cells <= occupied) {
            for key in center.neighbourhood(reach) {
                if let Some(cell) = self.cells.get(&key) {
                    collect(cell, point, radius, &mut nearby);
                }
            }
        } else {
            for (key, cell) in &self.cells {
                if key.within(center, reach) {
                    collect(cell, point, radius, &mut nearby);
                }
            }
        }

        tracing::debug!(
            ?point,
            radius,
            reach,
            matches = nearby.len(),
            "Spatial query"
        );
        Ok(nearby)
    }
}

fn collect<'a>(cell: &'a Cell, point: Point3, radius: f64, out: &mut Nearby<'a>) {
    out.cubes.extend(
        cell.cubes
            .iter()
            .filter(|c| distance(c.position, point) <= radius),
    );
    out.subcubes.extend(
        cell.subcubes
            .iter()
            .filter(|s| distance(s.center, point) <= radius),
    );
    out.subcube_vertices.extend(
        cell.subcube_vertices
            .iter()
            .filter(|v| distance(v.value.position(), point) <= radius),
    );
}

fn check_bin_size(bin_size: f64) -> Result<(), SpatialError> {
    if bin_size.is_finite() && bin_size > 0.0 {
        Ok(())
    } else {
        Err(SpatialError::InvalidBinSize(bin_size))
    }
}

/// `ceil(radius / bin_size)`, saturating.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn radius_in_bins(radius: f64, bin_size: f64) -> u64 {
    (radius / bin_size).ceil() as u64
}

fn distance(a: Point3, b: Point3) -> f64 {
    let [ax, ay, az] = a;
    let [bx, by, bz] = b;
    (bx - ax).mul_add(bx - ax, (by - ay).mul_add(by - ay, (bz - az) * (bz - az))).sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cubegrid_types::VertexValue;

    fn cube(id: &str, position: Point3) -> Cube {
        Cube {
            id: id.into(),
            window_uid: "w".into(),
            active_window_uid: None,
            position,
            subcube_ids: Vec::new(),
            vertices: Vec::new(),
            blending_logic_id: "blendBackground".to_owned(),
        }
    }

    fn vertex(id: &str, position: Point3) -> SubcubeVertex {
        SubcubeVertex::new(
            id.into(),
            "w".into(),
            "c".into(),
            "s".into(),
            VertexValue::new([0.0; 3], position, 1.0, "blendBackground"),
        )
    }

    fn snapshot() -> WindowSnapshot {
        WindowSnapshot::new("w".into())
    }

    fn cube_ids(nearby: &Nearby<'_>) -> Vec<String> {
        nearby.cubes.iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn radius_query_skips_distant_cells() {
        let mut snap = snapshot();
        snap.cubes = vec![cube("near", [0.0, 0.0, 0.0]), cube("far", [60.0, 60.0, 60.0])];
        let index = SpatialIndex::from_snapshot(snap, 50.0).unwrap();

        let nearby = index.query_near_position([0.0, 0.0, 0.0], 10.0).unwrap();
        assert_eq!(cube_ids(&nearby), vec!["near"]);
        assert_eq!(index.cell_count(), 2);
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let mut snap = snapshot();
        snap.subcube_vertices = vec![
            vertex("edge", [10.0, 0.0, 0.0]),
            vertex("out", [10.5, 0.0, 0.0]),
        ];
        let index = SpatialIndex::from_snapshot(snap, 4.0).unwrap();

        let nearby = index.query_near_position([0.0, 0.0, 0.0], 10.0).unwrap();
        let ids: Vec<String> = nearby.subcube_vertices.iter().map(|v| v.id.to_string()).collect();
        assert_eq!(ids, vec!["edge"]);
    }

    #[test]
    fn matches_cross_negative_cell_boundaries() {
        let mut snap = snapshot();
        snap.subcubes = vec![Subcube::new(
            "s".into(),
            "w".into(),
            "c".into(),
            [-1.0, -1.0, -1.0],
            0,
        )];
        let index = SpatialIndex::from_snapshot(snap, 50.0).unwrap();

        assert_eq!(index.cell_key([-1.0, -1.0, -1.0]), CellKey(-1, -1, -1));
        let nearby = index.query_near_position([1.0, 1.0, 1.0], 5.0).unwrap();
        assert_eq!(nearby.subcubes.len(), 1);
    }

    #[test]
    fn entities_sharing_a_cell_are_kept_by_kind() {
        let mut snap = snapshot();
        snap.cubes = vec![cube("c", [1.0, 1.0, 1.0])];
        snap.subcubes = vec![Subcube::new("s".into(), "w".into(), "c".into(), [2.0, 2.0, 2.0], 0)];
        snap.subcube_vertices = vec![vertex("v1", [3.0, 3.0, 3.0]), vertex("v2", [4.0, 4.0, 4.0])];
        let index = SpatialIndex::from_snapshot(snap, 10.0).unwrap();

        assert_eq!(index.len(), 4);
        let cell = index.cell(CellKey(0, 0, 0)).unwrap();
        assert_eq!(cell.cubes.len(), 1);
        assert_eq!(cell.subcubes.len(), 1);
        assert_eq!(cell.subcube_vertices.len(), 2);
    }

    #[test]
    fn results_match_a_full_scan() {
        // Deterministic scatter over [-100, 100)^3.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            f64::from(u32::try_from(state % 200).unwrap()) - 100.0
        };
        let points: Vec<Point3> = (0..300).map(|_| [next(), next(), next()]).collect();

        let mut snap = snapshot();
        snap.cubes = points
            .iter()
            .enumerate()
            .map(|(i, p)| cube(&i.to_string(), *p))
            .collect();
        let index = SpatialIndex::from_snapshot(snap, 7.5).unwrap();

        for (query, radius) in [
            ([0.0, 0.0, 0.0], 0.0),
            ([3.0, -4.0, 5.0], 12.0),
            ([-99.0, 99.0, 0.0], 40.0),
            ([50.0, 50.0, 50.0], 7.5),
            ([0.0, 0.0, 0.0], 500.0),
        ] {
            let mut expected: Vec<String> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| distance(**p, query) <= radius)
                .map(|(i, _)| i.to_string())
                .collect();
            let mut actual = cube_ids(&index.query_near_position(query, radius).unwrap());
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected, "query {query:?} radius {radius}");
        }
    }

    #[test]
    fn huge_radius_scans_occupied_cells() {
        let mut snap = snapshot();
        snap.cubes = vec![cube("a", [1e6, 0.0, 0.0]), cube("b", [-1e6, 0.0, 0.0])];
        let index = SpatialIndex::from_snapshot(snap, 1.0).unwrap();

        let nearby = index.query_near_position([0.0, 0.0, 0.0], 1e9).unwrap();
        assert_eq!(nearby.len(), 2);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            SpatialIndex::from_snapshot(snapshot(), 0.0),
            Err(SpatialError::InvalidBinSize(_))
        ));
        assert!(matches!(
            SpatialIndex::from_snapshot(snapshot(), f64::NAN),
            Err(SpatialError::InvalidBinSize(_))
        ));

        let index = SpatialIndex::from_snapshot(snapshot(), 1.0).unwrap();
        assert!(index.is_empty());
        assert!(matches!(
            index.query_near_position([0.0; 3], -1.0),
            Err(SpatialError::InvalidRadius(_))
        ));
        assert!(index.query_near_position([0.0; 3], 5.0).unwrap().is_empty());
    }

    #[test]
    fn neighbourhood_has_expected_side() {
        assert_eq!(CellKey(0, 0, 0).neighbourhood(0).count(), 1);
        assert_eq!(CellKey(5, -5, 0).neighbourhood(1).count(), 27);
        assert_eq!(CellKey(0, 0, 0).neighbourhood(2).count(), 125);
    }

    #[tokio::test]
    async fn build_indexes_only_the_requested_window() {
        use cubegrid_db::{MemoryBackend, StoreSchema};

        let mut store = EntityStore::new(MemoryBackend::new());
        store
            .initialize("spatial-test", 1, StoreSchema::standard())
            .await
            .unwrap();
        store.save_record(&cube("near", [10.0, 0.0, 0.0])).await.unwrap();
        store.save_record(&cube("far", [400.0, 0.0, 0.0])).await.unwrap();
        let mut other = cube("other", [0.0; 3]);
        other.window_uid = "w2".into();
        store.save_record(&other).await.unwrap();

        let index = SpatialIndex::build(&store, &"w".into(), 50.0).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.cell_count(), 2);

        let nearby = index.query_near_position([0.0; 3], 20.0).unwrap();
        assert_eq!(cube_ids(&nearby), vec!["near".to_owned()]);

        assert!(matches!(
            SpatialIndex::build(&store, &"w".into(), 0.0).await,
            Err(SpatialError::InvalidBinSize(_))
        ));
    }
}
