//! The built-in blend strategies.
//!
//! Every strategy is a pure function
//! `(base, incoming, params) -> color` applied per channel. Only the
//! additive background strategy clamps its output.

use cubegrid_types::Rgb;

use crate::error::BlendError;

/// Identifier of the weighted linear-interpolation strategy.
pub const WEIGHTED_VERTEX: &str = "BlendVrtxByWeight";

/// Identifier of the additive, clamped background strategy.
pub const BACKGROUND: &str = "blendBackground";

/// Identifier of the distance-falloff strategy.
pub const CORNER_PROXIMITY: &str = "BlendCornerByProximity";

/// Upper bound of a clamped color channel.
const CHANNEL_MAX: f64 = 255.0;

/// Per-call inputs shared by all strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    /// Interpolation weight; its absolute value is the proximity padding.
    pub weight: f64,
    /// Baseline color added to every blend.
    pub ambient: Rgb,
    /// Distance from the vertex to the subject point, when one is known.
    pub distance: Option<f64>,
}

impl BlendParams {
    /// Parameters without a subject distance.
    pub const fn new(weight: f64, ambient: Rgb) -> Self {
        Self {
            weight,
            ambient,
            distance: None,
        }
    }

    /// Attach the vertex-to-subject distance.
    #[must_use]
    pub const fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }
}

/// The closed set of blend strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendStrategy {
    /// `min(255, base + incoming + ambient)` per channel.
    #[default]
    Background,
    /// `base * (1 - w) + incoming * w + ambient` per channel, unclamped.
    WeightedVertex,
    /// Interpolates by `clamp(1 - distance / |w|, 0, 1)`, then adds ambient.
    CornerProximity,
}

impl BlendStrategy {
    /// All built-in strategies.
    pub const ALL: [Self; 3] = [Self::Background, Self::WeightedVertex, Self::CornerProximity];

    /// The identifier this strategy is registered under by default.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Background => BACKGROUND,
            Self::WeightedVertex => WEIGHTED_VERTEX,
            Self::CornerProximity => CORNER_PROXIMITY,
        }
    }

    /// Look up a built-in strategy by its identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Blend `incoming` into `base`.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::MissingDistance`] if this is
    /// [`BlendStrategy::CornerProximity`] and `params.distance` is `None`.
    pub fn blend(self, base: Rgb, incoming: Rgb, params: &BlendParams) -> Result<Rgb, BlendError> {
        match self {
            Self::Background => Ok(per_channel(base, incoming, params.ambient, |b, i, a| {
                (b + i + a).min(CHANNEL_MAX)
            })),
            Self::WeightedVertex => {
                Ok(lerp_plus_ambient(base, incoming, params.weight, params.ambient))
            }
            Self::CornerProximity => {
                let distance = params.distance.ok_or(BlendError::MissingDistance {
                    strategy: CORNER_PROXIMITY,
                })?;
                let factor = proximity_factor(distance, params.weight.abs());
                Ok(lerp_plus_ambient(base, incoming, factor, params.ambient))
            }
        }
    }
}

/// Falloff factor for a vertex `distance` away from the subject with the
/// given padding radius. Zero padding means no influence.
fn proximity_factor(distance: f64, padding: f64) -> f64 {
    if padding > 0.0 {
        (1.0 - distance / padding).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn lerp_plus_ambient(base: Rgb, incoming: Rgb, t: f64, ambient: Rgb) -> Rgb {
    per_channel(base, incoming, ambient, |b, i, a| b * (1.0 - t) + i * t + a)
}

fn per_channel(base: Rgb, incoming: Rgb, ambient: Rgb, f: impl Fn(f64, f64, f64) -> f64) -> Rgb {
    let mut out = [0.0; 3];
    for (o, ((b, i), a)) in out.iter_mut().zip(base.into_iter().zip(incoming).zip(ambient)) {
        *o = f(b, i, a);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rgb(actual: Rgb, expected: Rgb) {
        for (a, e) in actual.into_iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn background_clamps_each_channel_independently() {
        let params = BlendParams::new(0.0, [10.0, 10.0, 10.0]);
        let out = BlendStrategy::Background
            .blend([10.0, 10.0, 10.0], [250.0, 250.0, 10.0], &params)
            .unwrap_or_default();
        assert_rgb(out, [255.0, 255.0, 30.0]);
    }

    #[test]
    fn weighted_interpolates_and_adds_ambient_without_clamp() {
        let params = BlendParams::new(0.25, [100.0, 0.0, 0.0]);
        let out = BlendStrategy::WeightedVertex
            .blend([200.0, 0.0, 40.0], [0.0, 200.0, 40.0], &params)
            .unwrap_or_default();
        assert_rgb(out, [250.0, 50.0, 40.0]);

        let hot = BlendParams::new(1.0, [200.0, 0.0, 0.0]);
        let out = BlendStrategy::WeightedVertex
            .blend([0.0; 3], [255.0, 0.0, 0.0], &hot)
            .unwrap_or_default();
        assert_rgb(out, [455.0, 0.0, 0.0]);
    }

    #[test]
    fn weighted_is_order_dependent() {
        let params = BlendParams::new(0.5, [0.0; 3]);
        let s = BlendStrategy::WeightedVertex;
        let red = [255.0, 0.0, 0.0];
        let green = [0.0, 255.0, 0.0];
        let base = [0.0; 3];

        let red_first = s
            .blend(s.blend(base, red, &params).unwrap_or_default(), green, &params)
            .unwrap_or_default();
        let green_first = s
            .blend(s.blend(base, green, &params).unwrap_or_default(), red, &params)
            .unwrap_or_default();

        assert_rgb(red_first, [63.75, 127.5, 0.0]);
        assert_rgb(green_first, [127.5, 63.75, 0.0]);
    }

    #[test]
    fn proximity_requires_distance() {
        let params = BlendParams::new(10.0, [0.0; 3]);
        let result = BlendStrategy::CornerProximity.blend([0.0; 3], [255.0; 3], &params);
        assert_eq!(
            result,
            Err(BlendError::MissingDistance {
                strategy: CORNER_PROXIMITY
            })
        );
    }

    #[test]
    fn proximity_falls_off_with_distance() {
        let s = BlendStrategy::CornerProximity;
        let incoming = [200.0, 100.0, 0.0];

        let at_subject = BlendParams::new(-10.0, [0.0; 3]).with_distance(0.0);
        assert_rgb(s.blend([0.0; 3], incoming, &at_subject).unwrap_or_default(), incoming);

        let halfway = BlendParams::new(10.0, [1.0; 3]).with_distance(5.0);
        assert_rgb(
            s.blend([0.0; 3], incoming, &halfway).unwrap_or_default(),
            [101.0, 51.0, 1.0],
        );

        let outside = BlendParams::new(10.0, [0.0; 3]).with_distance(25.0);
        assert_rgb(s.blend([7.0; 3], incoming, &outside).unwrap_or_default(), [7.0; 3]);

        let no_padding = BlendParams::new(0.0, [0.0; 3]).with_distance(0.0);
        assert_rgb(s.blend([7.0; 3], incoming, &no_padding).unwrap_or_default(), [7.0; 3]);
    }

    #[test]
    fn names_round_trip() {
        for strategy in BlendStrategy::ALL {
            assert_eq!(BlendStrategy::from_name(strategy.name()), Some(strategy));
        }
        assert_eq!(BlendStrategy::from_name("blendSomethingElse"), None);
    }
}
