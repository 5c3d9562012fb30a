//! Game session state
//!
//! One `GameSession` per page. It owns the phase, the fruit queue, the
//! per-tier merge counters and the side table of fruit bodies; it never
//! touches the physics world directly.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{FruitBody, FruitTag};
use crate::platform::BodyHandle;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, nothing simulated yet
    Menu,
    /// Aiming; a drop input is accepted
    Ready,
    /// A fruit was just dropped; input ignored until the cooldown ends
    Drop,
    /// Run ended
    Lose,
}

/// Deferred transitions and effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeferredKind {
    /// Settling delay after start/restart is over
    EnterReady,
    /// Drop cooldown is over
    EndDropCooldown,
    /// Merge pop effect should disappear
    ExpirePop { id: u32 },
}

/// A deferred event, tagged with the generation it was scheduled in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub due_tick: u64,
    pub generation: u32,
    pub kind: DeferredKind,
}

/// Things the platform layer reacts to (sounds, effects, UI)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Two fruits merged; `tier` is the successor
    Merged { tier: usize, pos: Vec2 },
    /// Transient pop effect at a merge point
    PopSpawned { id: u32, pos: Vec2, radius: f32 },
    PopExpired { id: u32 },
    Dropped { tier: usize, x: f32 },
    ScoreChanged { score: u64 },
    NextFruit { tier: usize },
    /// The run ended; `new_highscore` picks the end screen title
    Lost { score: u64, new_highscore: bool },
    Restarted,
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    /// Number of draws taken, replayed to restore the stream
    pub draws: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        let mut rng = Pcg32::seed_from_u64(self.seed);
        for _ in 0..self.draws {
            let _: u32 = rng.random();
        }
        rng
    }
}

/// Complete session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub phase: GamePhase,
    /// Derived from `merge_counts`; refreshed by `Game::recompute_score`
    pub score: u64,
    /// Merges that happened at each tier
    pub merge_counts: Vec<u64>,
    pub current_tier: usize,
    pub next_tier: usize,
    pub highscore: u64,
    /// Restart counter; deferred events from older generations are stale
    pub generation: u32,
    pub time_ticks: u64,
    /// Tier tags for every fruit body in the world
    pub fruits: BTreeMap<BodyHandle, FruitTag>,
    /// Aiming body, present only while `Ready`
    pub preview: Option<BodyHandle>,
    pub pending: Vec<ScheduledEvent>,
    /// Drained by the platform layer each frame
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    pub rng_state: RngState,
    #[serde(skip, default = "default_rng")]
    rng: Pcg32,
    spawnable_tiers: usize,
    next_pop_id: u32,
}

fn default_rng() -> Pcg32 {
    Pcg32::seed_from_u64(0)
}

impl GameSession {
    /// New session in the menu. `tier_count` sizes the merge counters;
    /// queued fruit are drawn from `0..spawnable_tiers`.
    pub fn new(seed: u64, tier_count: usize, spawnable_tiers: usize) -> Self {
        let spawnable_tiers = spawnable_tiers.clamp(1, tier_count.max(1));
        let rng_state = RngState::new(seed);
        let mut session = Self {
            phase: GamePhase::Menu,
            score: 0,
            merge_counts: vec![0; tier_count],
            current_tier: 0,
            next_tier: 0,
            highscore: 0,
            generation: 0,
            time_ticks: 0,
            fruits: BTreeMap::new(),
            preview: None,
            pending: Vec::new(),
            events: Vec::new(),
            rng: rng_state.to_rng(),
            rng_state,
            spawnable_tiers,
            next_pop_id: 1,
        };
        session.seed_queue();
        session
    }

    /// Restore the RNG stream after deserializing
    pub fn restore_rng(&mut self) {
        self.rng = self.rng_state.to_rng();
    }

    /// Draw a tier for the fruit queue
    pub fn draw_tier(&mut self) -> usize {
        self.rng_state.draws += 1;
        let roll: u32 = self.rng.random();
        roll as usize % self.spawnable_tiers
    }

    /// Fill both queue slots with fresh draws
    pub fn seed_queue(&mut self) {
        self.current_tier = self.draw_tier();
        self.next_tier = self.draw_tier();
    }

    /// Shift the queue after a drop; returns the tier that was dropped
    pub fn advance_queue(&mut self) -> usize {
        let dropped = self.current_tier;
        self.current_tier = self.next_tier;
        self.next_tier = self.draw_tier();
        dropped
    }

    /// Track a fruit body in the side table
    pub fn register_fruit(&mut self, fruit: &FruitBody) {
        self.fruits.insert(fruit.handle, fruit.tag());
    }

    pub fn fruit(&self, handle: BodyHandle) -> Option<FruitTag> {
        self.fruits.get(&handle).copied()
    }

    /// Flag a fruit as consumed by a merge
    pub fn mark_merged(&mut self, handle: BodyHandle) {
        if let Some(tag) = self.fruits.get_mut(&handle) {
            tag.merged = true;
        }
    }

    pub fn forget_fruit(&mut self, handle: BodyHandle) -> Option<FruitTag> {
        self.fruits.remove(&handle)
    }

    /// Count a merge of two tier-`tier` fruits
    pub fn record_merge(&mut self, tier: usize) {
        if let Some(count) = self.merge_counts.get_mut(tier) {
            *count += 1;
        } else {
            log::warn!("Merge at unknown tier {}", tier);
        }
    }

    pub fn total_merges(&self) -> u64 {
        self.merge_counts.iter().sum()
    }

    /// Schedule `kind` to fire `delay` ticks from now in this generation
    pub fn schedule(&mut self, delay: u64, kind: DeferredKind) {
        self.pending.push(ScheduledEvent {
            due_tick: self.time_ticks + delay,
            generation: self.generation,
            kind,
        });
    }

    /// Remove and return events that are due, oldest first.
    ///
    /// Events from a previous generation are dropped here.
    pub fn take_due(&mut self) -> Vec<DeferredKind> {
        let now = self.time_ticks;
        let generation = self.generation;
        let mut due: Vec<ScheduledEvent> = Vec::new();
        self.pending.retain(|e| {
            if e.due_tick <= now {
                due.push(*e);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|e| e.due_tick);
        due.into_iter()
            .filter(|e| {
                let fresh = e.generation == generation;
                if !fresh {
                    log::debug!("Dropping stale {:?} from generation {}", e.kind, e.generation);
                }
                fresh
            })
            .map(|e| e.kind)
            .collect()
    }

    pub fn next_pop_id(&mut self) -> u32 {
        let id = self.next_pop_id;
        self.next_pop_id += 1;
        id
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Zero counters and reseed the queue for a new run.
    ///
    /// Bumps the generation so every pending deferred event goes stale.
    pub fn reset_run(&mut self) {
        self.score = 0;
        self.merge_counts.iter_mut().for_each(|c| *c = 0);
        self.fruits.clear();
        self.preview = None;
        self.generation = self.generation.wrapping_add(1);
        self.seed_queue();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = GameSession::new(1, 11, 5);
        assert_eq!(session.phase, GamePhase::Menu);
        assert_eq!(session.merge_counts, vec![0; 11]);
        assert!(session.current_tier < 5);
        assert!(session.next_tier < 5);
    }

    #[test]
    fn test_queue_draws_stay_in_spawnable_range() {
        let mut session = GameSession::new(42, 11, 3);
        for _ in 0..200 {
            let dropped = session.advance_queue();
            assert!(dropped < 3);
            assert!(session.next_tier < 3);
        }
    }

    #[test]
    fn test_queue_is_seeded() {
        let mut a = GameSession::new(7, 11, 5);
        let mut b = GameSession::new(7, 11, 5);
        for _ in 0..20 {
            assert_eq!(a.advance_queue(), b.advance_queue());
        }
    }

    #[test]
    fn test_rng_restored_after_serde() {
        let mut session = GameSession::new(9, 11, 5);
        session.advance_queue();
        session.advance_queue();

        let json = serde_json::to_string(&session).unwrap();
        let mut restored: GameSession = serde_json::from_str(&json).unwrap();
        restored.restore_rng();
        for _ in 0..10 {
            assert_eq!(session.advance_queue(), restored.advance_queue());
        }
    }

    #[test]
    fn test_stale_events_dropped_after_reset() {
        let mut session = GameSession::new(1, 11, 5);
        session.schedule(10, DeferredKind::EndDropCooldown);
        session.reset_run();
        session.schedule(5, DeferredKind::EnterReady);

        session.time_ticks = 4;
        assert!(session.take_due().is_empty());

        session.time_ticks = 20;
        assert_eq!(session.take_due(), vec![DeferredKind::EnterReady]);
        assert!(session.pending.is_empty());
    }

    #[test]
    fn test_due_events_in_order() {
        let mut session = GameSession::new(1, 11, 5);
        session.schedule(3, DeferredKind::ExpirePop { id: 2 });
        session.schedule(1, DeferredKind::ExpirePop { id: 1 });
        session.time_ticks = 3;
        assert_eq!(
            session.take_due(),
            vec![
                DeferredKind::ExpirePop { id: 1 },
                DeferredKind::ExpirePop { id: 2 }
            ]
        );
    }

    #[test]
    fn test_merge_bookkeeping() {
        let mut session = GameSession::new(1, 3, 3);
        let fruit = FruitBody {
            handle: BodyHandle(5),
            tier_index: 1,
            merged: false,
        };
        session.register_fruit(&fruit);
        session.mark_merged(fruit.handle);
        assert!(session.fruit(fruit.handle).unwrap().merged);
        session.record_merge(1);
        session.record_merge(7);
        assert_eq!(session.merge_counts, vec![0, 1, 0]);
        assert_eq!(session.total_merges(), 1);

        session.reset_run();
        assert_eq!(session.merge_counts, vec![0, 0, 0]);
        assert!(session.fruits.is_empty());
        assert_eq!(session.generation, 1);
    }
}
