//! The painter: bins vertices into a 2D/3D grid and composites their colors.
//!
//! Each call to [`Painter::create_bins`] builds a fresh [`BinMap`]; nothing
//! is cached between calls. Vertices are blended in input order, so
//! non-commutative strategies need a deterministic input order to give
//! reproducible output.

use cubegrid_types::{
    BackgroundMatrix, BinCell, BinKey, BinMap, CubeVertex, Point3, Rgb, Subcube, SubcubeVertex,
    bin_coord,
};

use crate::error::BlendError;
use crate::registry::BlendRegistry;
use crate::strategy::BlendParams;

/// One vertex as seen by the painter.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintVertex {
    /// Vertex position; `z` is the depth scalar.
    pub position: Point3,
    /// Vertex color.
    pub color: Rgb,
    /// Blend weight.
    pub weight: f64,
    /// Identifier resolved through the [`BlendRegistry`].
    pub blending_logic_id: String,
}

impl From<&CubeVertex> for PaintVertex {
    fn from(vertex: &CubeVertex) -> Self {
        Self {
            position: vertex.value_array.position(),
            color: vertex.value_array.color(),
            weight: vertex.value_array.weight(),
            blending_logic_id: vertex.blending_logic_id.clone(),
        }
    }
}

/// A parent entity (cube or subcube) and its nested vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintEntity {
    /// Vertices in blend order.
    pub vertices: Vec<PaintVertex>,
}

impl PaintEntity {
    /// Wrap an already-built vertex list.
    pub const fn new(vertices: Vec<PaintVertex>) -> Self {
        Self { vertices }
    }

    /// Paint input for a set of cube vertices, in the given order.
    pub fn from_cube_vertices(vertices: &[CubeVertex]) -> Self {
        Self::new(vertices.iter().map(PaintVertex::from).collect())
    }

    /// Paint input for a subcube.
    ///
    /// Vertices follow the subcube's `vertexArray` order and take their
    /// blending id from the matching pair. References to vertices missing
    /// from `vertices` are skipped.
    pub fn from_subcube(subcube: &Subcube, vertices: &[SubcubeVertex]) -> Self {
        let mut painted = Vec::with_capacity(subcube.vertex_array.len());
        for vertex_ref in &subcube.vertex_array {
            let Some(vertex) = vertices.iter().find(|v| v.id == vertex_ref.0) else {
                tracing::debug!(
                    subcube = %subcube.id,
                    vertex = %vertex_ref.0,
                    "Subcube references a vertex that was not supplied"
                );
                continue;
            };
            painted.push(PaintVertex {
                position: vertex.value.position(),
                color: vertex.value.color(),
                weight: vertex.value.weight(),
                blending_logic_id: vertex_ref.1.clone(),
            });
        }
        Self::new(painted)
    }
}

/// Explicit painter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PainterConfig {
    /// Edge length of a bin on every axis.
    pub bin_size: f64,
    /// Baseline color of fresh bins, also added by every blend.
    pub ambient: Rgb,
    /// Subject point used to compute distances for proximity blending.
    pub subject: Option<Point3>,
}

impl PainterConfig {
    /// A configuration without a subject point.
    pub const fn new(bin_size: f64, ambient: Rgb) -> Self {
        Self {
            bin_size,
            ambient,
            subject: None,
        }
    }

    /// Take the ambient baseline from a background matrix.
    pub const fn from_background(background: &BackgroundMatrix, bin_size: f64) -> Self {
        Self::new(bin_size, background.ambient_value)
    }

    /// Set the subject point for proximity blending.
    #[must_use]
    pub const fn with_subject(mut self, subject: Point3) -> Self {
        self.subject = Some(subject);
        self
    }
}

/// Composites vertex colors into bins.
#[derive(Debug, Clone)]
pub struct Painter {
    config: PainterConfig,
    registry: BlendRegistry,
}

impl Painter {
    /// Create a painter.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::InvalidBinSize`] unless `config.bin_size` is
    /// positive and finite.
    pub fn new(config: PainterConfig, registry: BlendRegistry) -> Result<Self, BlendError> {
        if !(config.bin_size.is_finite() && config.bin_size > 0.0) {
            return Err(BlendError::InvalidBinSize(config.bin_size));
        }
        Ok(Self { config, registry })
    }

    /// The painter's configuration.
    pub const fn config(&self) -> &PainterConfig {
        &self.config
    }

    /// The registry used to resolve blending ids.
    pub const fn registry(&self) -> &BlendRegistry {
        &self.registry
    }

    /// Bucket every vertex of `entities` into bins and blend colors per bin.
    ///
    /// Keys keep the depth axis when `is_background` is set and collapse it
    /// otherwise. A bin starts as the ambient color, inactive, at the depth
    /// of the first vertex that touches it. Background bins track the
    /// deepest contributing vertex.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::MissingDistance`] if a vertex resolves to the
    /// proximity strategy and no subject point is configured.
    pub fn create_bins(
        &self,
        entities: &[PaintEntity],
        is_background: bool,
    ) -> Result<BinMap, BlendError> {
        let mut bins = BinMap::new();
        let Some(max_depth) = find_farthest_depth(entities) else {
            return Ok(bins);
        };
        let bin_size = self.config.bin_size;
        let ambient = self.config.ambient;

        let mut contributed = 0_usize;
        for vertex in entities.iter().flat_map(|e| &e.vertices) {
            let [x, y, z] = vertex.position;
            let row = bin_coord(x, bin_size);
            let col = bin_coord(y, bin_size);
            let key = if is_background {
                BinKey::layered(row, col, bin_coord(z, bin_size))
            } else {
                BinKey::flat(row, col)
            };

            let cell = bins.entry(key).or_insert(BinCell {
                color: ambient,
                active: false,
                depth: z,
            });

            // max_depth is the global maximum, so this admits every vertex.
            if z <= max_depth + 1.0 {
                let strategy = self.registry.resolve(&vertex.blending_logic_id);
                let mut params = BlendParams::new(vertex.weight, ambient);
                if let Some(subject) = self.config.subject {
                    params = params.with_distance(distance(vertex.position, subject));
                }
                cell.color = strategy.blend(cell.color, vertex.color, &params)?;
                cell.active = true;
                if is_background {
                    cell.depth = cell.depth.max(z);
                }
                contributed = contributed.saturating_add(1);
            }
        }

        tracing::debug!(
            bins = bins.len(),
            contributed,
            is_background,
            max_depth,
            "Painted bins"
        );
        Ok(bins)
    }
}

/// Maximum `z` across every vertex of `entities`, or `None` if there are
/// no vertices.
pub fn find_farthest_depth(entities: &[PaintEntity]) -> Option<f64> {
    entities
        .iter()
        .flat_map(|e| &e.vertices)
        .map(|v| v.position[2])
        .reduce(f64::max)
}

fn distance(a: Point3, b: Point3) -> f64 {
    a.into_iter()
        .zip(b)
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}
