//! Platform abstraction layer
//!
//! Everything the game core consumes but does not own:
//! - Physics engine (body creation, world membership, collision-start pairs)
//! - UI displays (score, highscore, end screen, next-fruit preview)
//! - Sound playback
//!
//! Headless implementations live alongside the traits so the core runs
//! and tests without a browser.

pub mod headless;
pub mod physics;
pub mod ui;

pub use headless::HeadlessWorld;
pub use physics::{BodyConfig, BodyDesc, BodyHandle, BodyView, CollisionPair, PhysicsWorld};
pub use ui::{NullSound, NullUi, SoundSink, UiSink};
