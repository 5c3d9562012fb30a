//! Score calculation and the persisted high score
//!
//! The score is never stored on its own: it is recomputed from the per-tier
//! merge counters whenever they change.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persistence::{HIGHSCORE_KEY, Storage};
use crate::sim::catalog::FruitCatalog;

/// Persisted record, `{"highscore": n}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HighscoreRecord {
    pub highscore: u64,
}

/// Score from merge counters.
///
/// A merge counted at tier `i` is worth the score value of the tier it
/// produced (`i + 1`, or tier 0 when the top tier wraps around).
pub fn calculate_score(merge_counts: &[u64], catalog: &FruitCatalog) -> u64 {
    let tiers = catalog.tiers();
    if tiers.is_empty() {
        return 0;
    }
    merge_counts
        .iter()
        .enumerate()
        .map(|(i, &count)| count * tiers[(i + 1) % tiers.len()].score_value)
        .sum()
}

/// Outcome of a high score save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighscoreUpdate {
    pub highscore: u64,
    /// Show "New Highscore!" instead of "Game Over!"
    pub is_new: bool,
}

/// Tracks the best score and writes it through to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighscoreStore {
    record: HighscoreRecord,
}

impl HighscoreStore {
    pub fn highscore(&self) -> u64 {
        self.record.highscore
    }

    /// Read the stored record.
    ///
    /// A missing record triggers an initial save of 0. Unparseable JSON is an
    /// error; callers decide whether to reinitialise.
    pub fn load(storage: &mut dyn Storage) -> Result<Self> {
        match storage.get(HIGHSCORE_KEY)? {
            Some(json) => {
                let record: HighscoreRecord = serde_json::from_str(&json)?;
                log::info!("Loaded highscore {}", record.highscore);
                Ok(Self { record })
            }
            None => {
                let store = Self::default();
                store.persist(storage)?;
                log::info!("No highscore found, starting fresh");
                Ok(store)
            }
        }
    }

    /// Load, treating a corrupt record as absent and overwriting it with 0
    pub fn load_or_init(storage: &mut dyn Storage) -> Self {
        match Self::load(storage) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("Resetting highscore record: {}", e);
                let store = Self::default();
                if let Err(e) = store.persist(storage) {
                    log::warn!("Could not write highscore: {}", e);
                }
                store
            }
        }
    }

    /// Record `score` if it is not below the current high score.
    ///
    /// Equal scores are re-saved and flagged as new, matching the "score is
    /// not below" rule; lower scores are a no-op.
    pub fn save_highscore(&mut self, score: u64, storage: &mut dyn Storage) -> Result<HighscoreUpdate> {
        if score < self.record.highscore {
            return Ok(HighscoreUpdate {
                highscore: self.record.highscore,
                is_new: false,
            });
        }
        self.record.highscore = score;
        self.persist(storage)?;
        log::info!("New highscore {}", score);
        Ok(HighscoreUpdate {
            highscore: score,
            is_new: true,
        })
    }

    fn persist(&self, storage: &mut dyn Storage) -> Result<()> {
        storage.set(HIGHSCORE_KEY, &serde_json::to_string(&self.record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::persistence::MemoryStorage;
    use crate::sim::catalog::FruitTier;
    use proptest::prelude::*;

    fn three_tier_catalog() -> FruitCatalog {
        FruitCatalog::new(vec![
            FruitTier::new("a", 10.0, 1.0, 2),
            FruitTier::new("b", 20.0, 1.0, 5),
            FruitTier::new("c", 30.0, 1.0, 9),
        ])
    }

    #[test]
    fn test_score_uses_successor_value() {
        let catalog = three_tier_catalog();
        assert_eq!(calculate_score(&[1, 0, 0], &catalog), 5);
        assert_eq!(calculate_score(&[2, 1, 0], &catalog), 2 * 5 + 9);
        // Top-tier wraparound is worth tier 0
        assert_eq!(calculate_score(&[0, 0, 1], &catalog), 2);
        assert_eq!(calculate_score(&[], &catalog), 0);
    }

    #[test]
    fn test_missing_record_saves_zero() {
        let mut storage = MemoryStorage::new();
        let store = HighscoreStore::load(&mut storage).unwrap();
        assert_eq!(store.highscore(), 0);
        assert_eq!(
            storage.get(HIGHSCORE_KEY).unwrap().as_deref(),
            Some(r#"{"highscore":0}"#)
        );
    }

    #[test]
    fn test_malformed_record() {
        let mut storage = MemoryStorage::new();
        storage.set(HIGHSCORE_KEY, "{not json").unwrap();
        assert!(matches!(
            HighscoreStore::load(&mut storage),
            Err(GameError::MalformedState(_))
        ));

        let store = HighscoreStore::load_or_init(&mut storage);
        assert_eq!(store.highscore(), 0);
        assert_eq!(HighscoreStore::load(&mut storage).unwrap().highscore(), 0);
    }

    #[test]
    fn test_save_highscore() {
        let mut storage = MemoryStorage::new();
        storage.set(HIGHSCORE_KEY, r#"{"highscore":40}"#).unwrap();
        let mut store = HighscoreStore::load(&mut storage).unwrap();
        assert_eq!(store.highscore(), 40);

        let update = store.save_highscore(12, &mut storage).unwrap();
        assert!(!update.is_new);
        assert_eq!(update.highscore, 40);

        let update = store.save_highscore(55, &mut storage).unwrap();
        assert!(update.is_new);
        assert_eq!(HighscoreStore::load(&mut storage).unwrap().highscore(), 55);
    }

    proptest! {
        #[test]
        fn highscore_never_decreases(scores in prop::collection::vec(0u64..10_000, 1..40)) {
            let mut storage = MemoryStorage::new();
            let mut store = HighscoreStore::load(&mut storage).unwrap();
            let mut best = 0;
            for score in scores {
                store.save_highscore(score, &mut storage).unwrap();
                best = best.max(score);
                let persisted = HighscoreStore::load(&mut storage).unwrap().highscore();
                prop_assert_eq!(persisted, best);
                prop_assert_eq!(store.highscore(), best);
            }
        }
    }
}
