//! Key-value persistence
//!
//! The game stores a handful of small values (high score record, volumes,
//! settings) under fixed keys. On the web these live in LocalStorage; native
//! builds and tests use an in-memory map.

use std::collections::BTreeMap;

use crate::error::Result;

#[cfg(target_arch = "wasm32")]
mod local;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

/// High score record, JSON `{"highscore": n}`
pub const HIGHSCORE_KEY: &str = "fruit_merge_highscore";
pub const SFX_VOLUME_KEY: &str = "fruit_merge_sfx_volume";
pub const MUSIC_VOLUME_KEY: &str = "fruit_merge_music_volume";
pub const SETTINGS_KEY: &str = "fruit_merge_settings";

/// String key-value store, last write wins
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory storage for native builds and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
