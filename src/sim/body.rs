//! Fruit body factory
//!
//! Turns a tier index and a position into an engine body. The game-specific
//! data (tier, merged flag) stays on our side in `FruitBody`; the engine
//! only sees a polygon.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::catalog::{FruitCatalog, ShapeKind};
use super::geometry::circle_vertices;
use crate::GameConfig;
use crate::error::{GameError, Result};
use crate::platform::{BodyConfig, BodyDesc, BodyHandle, PhysicsWorld};
use crate::settings::DeviceTier;

/// Game data attached to an engine body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitTag {
    pub tier_index: usize,
    /// Set once, when the body is picked as a merge input
    pub merged: bool,
}

/// An engine body that is a fruit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FruitBody {
    pub handle: BodyHandle,
    pub tier_index: usize,
    pub merged: bool,
}

impl FruitBody {
    pub fn tag(&self) -> FruitTag {
        FruitTag {
            tier_index: self.tier_index,
            merged: self.merged,
        }
    }
}

/// Builds fruit bodies from the catalog
#[derive(Debug, Clone)]
pub struct FruitFactory {
    pub catalog: FruitCatalog,
    pub device_tier: DeviceTier,
    pub friction: f32,
    pub restitution: f32,
}

impl FruitFactory {
    pub fn new(catalog: FruitCatalog, device_tier: DeviceTier, config: &GameConfig) -> Self {
        Self {
            catalog,
            device_tier,
            friction: config.friction,
            restitution: config.restitution,
        }
    }

    /// Create (but do not add) the body for a fruit of `tier_index` at `(x, y)`.
    ///
    /// Does not touch session state. The tier's cached radius is refreshed
    /// as a side effect.
    pub fn create_fruit_body(
        &mut self,
        world: &mut dyn PhysicsWorld,
        x: f32,
        y: f32,
        tier_index: usize,
        extra: BodyConfig,
    ) -> Result<FruitBody> {
        let default_sides = self.device_tier.circle_sides();
        let tier = self.catalog.get_mut(tier_index)?;
        let radius = tier.refresh_radius();

        let vertices = match tier.shape {
            ShapeKind::Circle => circle_vertices(radius, tier.sides_override.unwrap_or(default_sides))?,
            ShapeKind::Custom => {
                let vertex_fn = tier.vertex_fn.ok_or_else(|| {
                    GameError::Configuration(format!(
                        "tier {} ({}) has a custom shape but no vertex function",
                        tier_index, tier.name
                    ))
                })?;
                vertex_fn(radius)
            }
        };

        let handle = world.create_body(BodyDesc {
            vertices,
            position: Vec2::new(x, y),
            circle_radius: Some(radius),
            is_static: extra.is_static,
            is_sensor: extra.is_sensor,
            friction: extra.friction.unwrap_or(self.friction),
            restitution: extra.restitution.unwrap_or(self.restitution),
        });

        Ok(FruitBody {
            handle,
            tier_index,
            merged: false,
        })
    }
}
