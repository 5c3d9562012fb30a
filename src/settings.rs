//! Player preferences
//!
//! Volumes are persisted under their own numeric keys so the audio layer can
//! read and write them independently; the rest is one JSON blob.

use serde::{Deserialize, Serialize};

use crate::consts::{CONSTRAINED_SIDES, DEFAULT_SIDES};
use crate::error::Result;
use crate::persistence::{MUSIC_VOLUME_KEY, SETTINGS_KEY, SFX_VOLUME_KEY, Storage};

pub const DEFAULT_SFX_VOLUME: f32 = 0.7;
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.5;

/// Device capability level, picks the polygon detail of fruit bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceTier {
    /// Phones and low-power devices
    Constrained,
    #[default]
    Standard,
}

impl DeviceTier {
    /// Polygon sides for circular fruit without a per-tier override
    pub fn circle_sides(&self) -> u32 {
        match self {
            DeviceTier::Constrained => CONSTRAINED_SIDES,
            DeviceTier::Standard => DEFAULT_SIDES,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub device_tier: DeviceTier,
    /// Sound effects volume (0.0 - 1.0), own storage key
    #[serde(skip, default = "default_sfx_volume")]
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0), own storage key
    #[serde(skip, default = "default_music_volume")]
    pub music_volume: f32,
}

fn default_sfx_volume() -> f32 {
    DEFAULT_SFX_VOLUME
}

fn default_music_volume() -> f32 {
    DEFAULT_MUSIC_VOLUME
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_tier: DeviceTier::Standard,
            sfx_volume: DEFAULT_SFX_VOLUME,
            music_volume: DEFAULT_MUSIC_VOLUME,
        }
    }
}

/// Read a persisted volume; unparseable values fall back to the default
fn load_volume(storage: &dyn Storage, key: &str, default: f32) -> f32 {
    match storage.get(key) {
        Ok(Some(raw)) => match raw.trim().parse::<f32>() {
            Ok(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => {
                log::warn!("Ignoring bad volume {:?} under {}", raw, key);
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            log::warn!("Could not read {}: {}", key, e);
            default
        }
    }
}

impl Settings {
    pub fn for_device(device_tier: DeviceTier) -> Self {
        Self {
            device_tier,
            ..Self::default()
        }
    }

    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_music_volume(&mut self, vol: f32) {
        self.music_volume = vol.clamp(0.0, 1.0);
    }

    /// Load settings; missing or corrupt entries use defaults
    pub fn load(storage: &dyn Storage) -> Self {
        Self::load_for_device(storage, DeviceTier::default())
    }

    /// Load settings, falling back to `detected` when no device tier was
    /// stored yet. A stored tier always wins over detection.
    pub fn load_for_device(storage: &dyn Storage, detected: DeviceTier) -> Self {
        let mut settings = match storage.get(SETTINGS_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Discarding corrupt settings: {}", e);
                Self::for_device(detected)
            }),
            Ok(None) => {
                log::info!("Using default settings ({:?})", detected);
                Self::for_device(detected)
            }
            Err(e) => {
                log::warn!("Could not read settings: {}", e);
                Self::for_device(detected)
            }
        };
        settings.sfx_volume = load_volume(storage, SFX_VOLUME_KEY, DEFAULT_SFX_VOLUME);
        settings.music_volume = load_volume(storage, MUSIC_VOLUME_KEY, DEFAULT_MUSIC_VOLUME);
        settings
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<()> {
        storage.set(SETTINGS_KEY, &serde_json::to_string(self)?)?;
        self.save_volumes(storage)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Persist only the two volume keys
    pub fn save_volumes(&self, storage: &mut dyn Storage) -> Result<()> {
        storage.set(SFX_VOLUME_KEY, &self.sfx_volume.to_string())?;
        storage.set(MUSIC_VOLUME_KEY, &self.music_volume.to_string())
    }
}
