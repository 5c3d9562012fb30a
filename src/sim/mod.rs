//! Deterministic game core
//!
//! All gameplay rules live here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (collision pairs in engine order, bodies by handle)
//! - No rendering or platform dependencies beyond the collaborator traits

pub mod body;
pub mod catalog;
pub mod geometry;
pub mod merge;
pub mod state;
pub mod tick;

pub use body::{FruitBody, FruitFactory, FruitTag};
pub use catalog::{FruitCatalog, FruitTier, ShapeKind, TierOverride, VertexFn};
pub use geometry::circle_vertices;
pub use merge::{MergeReport, SpawnedFruit, resolve_merge_batch, successor_tier};
pub use state::{DeferredKind, GameEvent, GamePhase, GameSession, ScheduledEvent};
pub use tick::{Game, TickInput};
