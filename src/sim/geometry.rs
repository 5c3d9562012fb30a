//! Polygon approximations of circles for fruit bodies
//!
//! The physics collaborator only understands vertex lists, so every round
//! fruit is built from a regular polygon centered at the origin.

use glam::Vec2;

use crate::error::{GameError, Result};
use crate::polar_to_cartesian;

/// Generate `sides` points on a circle of `radius`, starting at angle 0
/// and stepping by `2π / sides` counter-clockwise.
///
/// Fewer than 3 sides is rejected rather than clamped.
pub fn circle_vertices(radius: f32, sides: u32) -> Result<Vec<Vec2>> {
    if sides < 3 {
        return Err(GameError::InvalidGeometry { sides });
    }

    let step = std::f32::consts::TAU / sides as f32;
    Ok((0..sides)
        .map(|i| polar_to_cartesian(radius, step * i as f32))
        .collect())
}

/// Largest distance of any vertex from the origin
pub fn bounding_radius(vertices: &[Vec2]) -> f32 {
    vertices.iter().map(|v| v.length()).fold(0.0, f32::max)
}
