//! Physics engine collaborator interface
//!
//! The game never integrates bodies itself; it asks the engine to build
//! bodies from vertex lists, adds and removes them, and reads back the few
//! fields the merge rules need.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque engine body identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Extra body options merged over the fruit defaults
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Immovable body (walls, floor, aiming preview)
    pub is_static: bool,
    /// Takes part in no collisions (aiming preview)
    pub is_sensor: bool,
    pub friction: Option<f32>,
    pub restitution: Option<f32>,
}

impl BodyConfig {
    /// Options for the static, non-colliding aiming body
    pub fn preview() -> Self {
        Self {
            is_static: true,
            is_sensor: true,
            ..Default::default()
        }
    }
}

/// Everything the engine needs to build a body
#[derive(Debug, Clone)]
pub struct BodyDesc {
    /// Shape outline, centered on the origin
    pub vertices: Vec<Vec2>,
    pub position: Vec2,
    /// Set for round bodies; reported back through `BodyView::circle_radius`
    pub circle_radius: Option<f32>,
    pub is_static: bool,
    pub is_sensor: bool,
    pub friction: f32,
    pub restitution: f32,
}

/// Read-only snapshot of the body fields the game uses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub handle: BodyHandle,
    pub position: Vec2,
    pub circle_radius: Option<f32>,
    pub is_static: bool,
}

impl BodyView {
    /// Top edge in canvas coordinates (y grows downward)
    #[inline]
    pub fn top_edge(&self) -> f32 {
        self.position.y - self.circle_radius.unwrap_or(0.0)
    }
}

/// Two bodies that started touching this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        Self { a, b }
    }
}

/// A 2D rigid-body world
pub trait PhysicsWorld {
    /// Build a body (not yet simulated)
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    /// Start simulating a created body
    fn add_body(&mut self, handle: BodyHandle);
    /// Remove a body from the world; unknown handles are ignored
    fn remove_body(&mut self, handle: BodyHandle);
    /// Snapshot of a body currently in the world
    fn body(&self, handle: BodyHandle) -> Option<BodyView>;
    /// Handles of every body in the world, in stable order
    fn bodies(&self) -> Vec<BodyHandle>;
    /// Move a body without simulating (aiming preview follows the pointer)
    fn set_position(&mut self, handle: BodyHandle, position: Vec2);
    /// Advance the world and return this tick's collision-start pairs
    fn step(&mut self, dt: f32) -> Vec<CollisionPair>;
}
