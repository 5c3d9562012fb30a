//! Fruit size tiers
//!
//! The catalog is an ordered ladder of fruit definitions, smallest first.
//! Two fruits of tier `i` merge into tier `i + 1`; the last tier wraps back
//! to tier 0.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::RADIUS_TOLERANCE;
use crate::error::{GameError, Result};

/// Vertex generator for non-circular fruit; receives the physics radius
pub type VertexFn = fn(f32) -> Vec<Vec2>;

/// How a tier's collision shape is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Circle,
    /// Requires `FruitTier::vertex_fn`
    Custom,
}

/// One fruit size class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FruitTier {
    /// Art key, also used for the next-fruit preview image
    pub name: String,
    /// Reference pixel size of the source art
    pub texture_size: f32,
    /// Visual multiplier applied to the art
    pub display_scale: f32,
    /// Collision multiplier (falls back to `display_scale`)
    #[serde(default)]
    pub physics_scale: Option<f32>,
    /// Points per merge (see `highscores::calculate_score` for attribution)
    pub score_value: u64,
    #[serde(default)]
    pub shape: ShapeKind,
    #[serde(skip)]
    pub vertex_fn: Option<VertexFn>,
    /// Polygon side count, overrides the device default
    #[serde(default)]
    pub sides_override: Option<u32>,
    #[serde(skip)]
    computed_radius: f32,
}

impl FruitTier {
    pub fn new(name: &str, texture_size: f32, display_scale: f32, score_value: u64) -> Self {
        let mut tier = Self {
            name: name.to_string(),
            texture_size,
            display_scale,
            physics_scale: None,
            score_value,
            shape: ShapeKind::Circle,
            vertex_fn: None,
            sides_override: None,
            computed_radius: 0.0,
        };
        tier.refresh_radius();
        tier
    }

    pub fn with_physics_scale(mut self, scale: f32) -> Self {
        self.physics_scale = Some(scale);
        self.refresh_radius();
        self
    }

    pub fn with_sides(mut self, sides: u32) -> Self {
        self.sides_override = Some(sides);
        self
    }

    pub fn with_custom_shape(mut self, vertex_fn: VertexFn) -> Self {
        self.shape = ShapeKind::Custom;
        self.vertex_fn = Some(vertex_fn);
        self
    }

    /// Effective collision multiplier
    #[inline]
    pub fn physics_scale(&self) -> f32 {
        self.physics_scale.unwrap_or(self.display_scale)
    }

    /// Physics radius, `texture_size * physics_scale / 2`
    #[inline]
    pub fn computed_radius(&self) -> f32 {
        self.computed_radius
    }

    /// On-screen radius of the art
    #[inline]
    pub fn display_radius(&self) -> f32 {
        self.texture_size * self.display_scale / 2.0
    }

    /// Recompute the physics radius from texture size and scale
    pub fn refresh_radius(&mut self) -> f32 {
        self.computed_radius = self.texture_size * self.physics_scale() / 2.0;
        self.computed_radius
    }

    fn validate(&self) -> Result<()> {
        if !(self.texture_size > 0.0) {
            return Err(GameError::Configuration(format!(
                "{}: texture size must be positive, got {}",
                self.name, self.texture_size
            )));
        }
        if !(self.physics_scale() > 0.0) {
            return Err(GameError::Configuration(format!(
                "{}: physics scale must be positive, got {}",
                self.name,
                self.physics_scale()
            )));
        }
        match self.sides_override {
            Some(sides) if sides < 3 => Err(GameError::InvalidGeometry { sides }),
            _ => Ok(()),
        }
    }
}

/// Partial update for one tier, applied from the tuning surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierOverride {
    pub texture_size: Option<f32>,
    pub display_scale: Option<f32>,
    pub physics_scale: Option<f32>,
    pub score_value: Option<u64>,
    pub sides_override: Option<u32>,
}

/// Ordered fruit ladder, index 0 = smallest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FruitCatalog {
    tiers: Vec<FruitTier>,
}

impl Default for FruitCatalog {
    fn default() -> Self {
        Self::new(vec![
            FruitTier::new("cherry", 64.0, 0.75, 1),
            FruitTier::new("strawberry", 64.0, 1.0, 3),
            FruitTier::new("grape", 128.0, 0.625, 6),
            FruitTier::new("dekopon", 128.0, 0.75, 10),
            FruitTier::new("persimmon", 128.0, 0.9375, 15),
            FruitTier::new("apple", 256.0, 0.5625, 21),
            FruitTier::new("pear", 256.0, 0.65625, 28),
            FruitTier::new("peach", 256.0, 0.78125, 36),
            FruitTier::new("pineapple", 256.0, 0.90625, 45),
            FruitTier::new("melon", 512.0, 0.5, 55),
            FruitTier::new("watermelon", 512.0, 0.5625, 66),
        ])
    }
}

impl FruitCatalog {
    pub fn new(mut tiers: Vec<FruitTier>) -> Self {
        for tier in &mut tiers {
            tier.refresh_radius();
        }
        Self { tiers }
    }

    /// Load a catalog from a JSON array of tiers
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog = Self::new(serde_json::from_str(json)?);
        if catalog.is_empty() {
            return Err(GameError::Configuration("catalog has no tiers".into()));
        }
        for tier in &catalog.tiers {
            tier.validate()?;
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[FruitTier] {
        &self.tiers
    }

    pub fn get(&self, index: usize) -> Result<&FruitTier> {
        self.tiers.get(index).ok_or(GameError::OutOfRange {
            index,
            len: self.tiers.len(),
        })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut FruitTier> {
        let len = self.tiers.len();
        self.tiers
            .get_mut(index)
            .ok_or(GameError::OutOfRange { index, len })
    }

    /// Index of the terminal tier
    pub fn last_index(&self) -> usize {
        self.tiers.len().saturating_sub(1)
    }

    /// Physics radius of the terminal tier
    pub fn top_radius(&self) -> f32 {
        self.tiers.last().map_or(0.0, FruitTier::computed_radius)
    }

    /// Find the non-terminal tier whose radius matches a physics-observed radius.
    ///
    /// The terminal tier is never returned: it has no natural successor.
    pub fn lookup_tier_by_radius(&self, radius: f32) -> Option<usize> {
        let last = self.tiers.len().checked_sub(1)?;
        self.tiers[..last]
            .iter()
            .position(|t| (t.computed_radius - radius).abs() <= RADIUS_TOLERANCE)
    }

    /// Apply a tuning override to one tier. Takes effect on the next body built.
    pub fn apply_override(&mut self, index: usize, patch: &TierOverride) -> Result<()> {
        let tier = self.get_mut(index)?;
        let mut updated = tier.clone();
        if let Some(v) = patch.texture_size {
            updated.texture_size = v;
        }
        if let Some(v) = patch.display_scale {
            updated.display_scale = v;
        }
        if let Some(v) = patch.physics_scale {
            updated.physics_scale = Some(v);
        }
        if let Some(v) = patch.score_value {
            updated.score_value = v;
        }
        if let Some(v) = patch.sides_override {
            updated.sides_override = Some(v);
        }
        updated.validate()?;
        updated.refresh_radius();

        log::debug!(
            "Tier {} ({}) radius {:.2} -> {:.2}",
            index,
            updated.name,
            tier.computed_radius,
            updated.computed_radius
        );
        *tier = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_radii_non_decreasing() {
        let catalog = FruitCatalog::default();
        assert_eq!(catalog.len(), 11);
        for pair in catalog.tiers().windows(2) {
            assert!(pair[0].computed_radius() <= pair[1].computed_radius());
        }
        assert_eq!(catalog.get(0).unwrap().computed_radius(), 24.0);
        assert_eq!(catalog.top_radius(), 144.0);
    }

    #[test]
    fn test_physics_scale_defaults_to_display_scale() {
        let tier = FruitTier::new("plum", 100.0, 0.5, 1);
        assert_eq!(tier.computed_radius(), 25.0);

        let tier = tier.with_physics_scale(0.4);
        assert_eq!(tier.computed_radius(), 20.0);
        assert_eq!(tier.display_radius(), 25.0);
    }

    #[test]
    fn test_lookup_round_trip() {
        let catalog = FruitCatalog::default();
        for i in 0..catalog.last_index() {
            let r = catalog.get(i).unwrap().computed_radius();
            assert_eq!(catalog.lookup_tier_by_radius(r), Some(i));
        }
        assert_eq!(catalog.lookup_tier_by_radius(catalog.top_radius()), None);
    }

    #[test]
    fn test_lookup_tolerance() {
        let catalog = FruitCatalog::default();
        assert_eq!(catalog.lookup_tier_by_radius(24.4), Some(0));
        assert_eq!(catalog.lookup_tier_by_radius(23.6), Some(0));
        assert_eq!(catalog.lookup_tier_by_radius(24.6), None);
        assert_eq!(catalog.lookup_tier_by_radius(0.0), None);
        assert_eq!(FruitCatalog::new(Vec::new()).lookup_tier_by_radius(1.0), None);
    }

    #[test]
    fn test_get_out_of_range() {
        let catalog = FruitCatalog::default();
        assert!(matches!(
            catalog.get(11),
            Err(GameError::OutOfRange { index: 11, len: 11 })
        ));
    }

    #[test]
    fn test_override_recomputes_radius() {
        let mut catalog = FruitCatalog::default();
        catalog
            .apply_override(
                0,
                &TierOverride {
                    physics_scale: Some(0.5),
                    score_value: Some(4),
                    ..Default::default()
                },
            )
            .unwrap();
        let tier = catalog.get(0).unwrap();
        assert_eq!(tier.computed_radius(), 16.0);
        assert_eq!(tier.score_value, 4);
        assert_eq!(catalog.lookup_tier_by_radius(16.0), Some(0));
    }

    #[test]
    fn test_override_rejects_bad_values() {
        let mut catalog = FruitCatalog::default();
        let bad_scale = TierOverride {
            physics_scale: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            catalog.apply_override(1, &bad_scale),
            Err(GameError::Configuration(_))
        ));
        // Rejected override leaves the tier untouched
        assert_eq!(catalog.get(1).unwrap().computed_radius(), 32.0);

        assert!(catalog.apply_override(42, &TierOverride::default()).is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            { "name": "a", "texture_size": 10.0, "display_scale": 1.0, "score_value": 2 },
            { "name": "b", "texture_size": 20.0, "display_scale": 1.0, "physics_scale": 0.9, "score_value": 5 },
            { "name": "c", "texture_size": 30.0, "display_scale": 1.0, "score_value": 9, "sides_override": 8 }
        ]"#;
        let catalog = FruitCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(0).unwrap().computed_radius(), 5.0);
        assert_eq!(catalog.get(1).unwrap().computed_radius(), 9.0);
        assert_eq!(catalog.get(2).unwrap().sides_override, Some(8));

        assert!(FruitCatalog::from_json("[]").is_err());
        assert!(matches!(
            FruitCatalog::from_json("not json"),
            Err(GameError::MalformedState(_))
        ));
    }
}
