//! Error types for the game core.
//!
//! Programming errors (bad tier index, broken catalog entry) are returned as
//! values and propagated with `?` so the loop can log them instead of
//! panicking mid-frame.

use thiserror::Error;

pub type Result<T, E = GameError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GameError {
    /// A tier index does not exist in the catalog.
    #[error("tier index {index} out of range (catalog has {len} tiers)")]
    OutOfRange { index: usize, len: usize },

    /// A catalog entry cannot be turned into a body.
    #[error("invalid fruit configuration: {0}")]
    Configuration(String),

    /// Circle approximation requested with too few sides.
    #[error("a polygon needs at least 3 sides, got {sides}")]
    InvalidGeometry { sides: u32 },

    /// The storage backend refused a read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// Persisted JSON could not be parsed.
    #[error("malformed persisted state: {0}")]
    MalformedState(#[from] serde_json::Error),
}
