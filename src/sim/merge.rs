//! Merge resolution
//!
//! The tricky part of the game: turning the engine's raw stream of
//! collision-start pairs into merges. Pairs are handled strictly in the
//! order the engine reports them, and a body picked for one merge is
//! flagged so it cannot take part in another pair of the same batch
//! (three touching fruits merge once, not three times).

use std::collections::BTreeMap;

use glam::Vec2;

use super::body::FruitFactory;
use super::catalog::FruitCatalog;
use super::state::{DeferredKind, GameEvent, GamePhase, GameSession};
use crate::error::Result;
use crate::highscores::calculate_score;
use crate::midpoint;
use crate::platform::{BodyConfig, BodyHandle, BodyView, CollisionPair, PhysicsWorld};
use crate::GameConfig;

/// A fruit produced by a merge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnedFruit {
    pub handle: BodyHandle,
    pub tier: usize,
    pub pos: Vec2,
}

/// What one batch did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub successors: Vec<SpawnedFruit>,
    /// Bodies consumed by merges, in retirement order
    pub retired: Vec<BodyHandle>,
    pub score_delta: u64,
    /// A fruit crossed the lose line; the rest of the batch was skipped
    pub lost: bool,
}

impl MergeReport {
    pub fn merges(&self) -> usize {
        self.successors.len()
    }
}

/// Tier produced by merging two fruits of `tier`.
///
/// Fruits already as large as the top tier wrap around to tier 0.
pub fn successor_tier(tier: usize, observed_radius: f32, catalog: &FruitCatalog) -> usize {
    if observed_radius >= catalog.top_radius() {
        0
    } else {
        tier + 1
    }
}

/// Resolve one tick's collision-start pairs against the session.
///
/// Retired bodies are removed from `world`, successors are created and
/// added to it. Fails only if the factory rejects a successor tier.
pub fn resolve_merge_batch(
    pairs: &[CollisionPair],
    world: &mut dyn PhysicsWorld,
    session: &mut GameSession,
    factory: &mut FruitFactory,
    config: &GameConfig,
) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    if session.phase == GamePhase::Lose || pairs.is_empty() {
        return Ok(report);
    }

    // Engine bodies as they were when the batch was reported; retired
    // bodies keep their snapshot so later pairs still see them.
    let mut snapshot: BTreeMap<BodyHandle, BodyView> = BTreeMap::new();
    for pair in pairs {
        for handle in [pair.a, pair.b] {
            if let Some(view) = world.body(handle) {
                snapshot.insert(handle, view);
            }
        }
    }

    let score_before = session.score;

    for pair in pairs {
        let (Some(a), Some(b)) = (snapshot.get(&pair.a).copied(), snapshot.get(&pair.b).copied())
        else {
            continue;
        };

        if a.top_edge() < config.lose_height || b.top_edge() < config.lose_height {
            log::info!(
                "Fruit crossed the lose line ({:.1} / {:.1} < {:.1})",
                a.top_edge(),
                b.top_edge(),
                config.lose_height
            );
            session.phase = GamePhase::Lose;
            report.lost = true;
            break;
        }

        if a.is_static || b.is_static {
            continue;
        }

        let (Some(tag_a), Some(tag_b)) = (session.fruit(a.handle), session.fruit(b.handle)) else {
            continue;
        };
        if tag_a.tier_index != tag_b.tier_index {
            continue;
        }
        if tag_a.merged || tag_b.merged {
            continue;
        }

        let tier = tag_a.tier_index;
        let radius = a.circle_radius.unwrap_or(0.0);
        let successor = successor_tier(tier, radius, &factory.catalog);
        if successor == tier + 1 && factory.catalog.lookup_tier_by_radius(radius) != Some(tier) {
            log::debug!(
                "Body {} radius {:.2} does not match tier {} (catalog override?)",
                a.handle,
                radius,
                tier
            );
        }

        // Build the successor before touching anything, so a bad tier
        // leaves this pair intact
        let pos = midpoint(a.position, b.position);
        let built = factory
            .create_fruit_body(world, pos.x, pos.y, successor, BodyConfig::default())
            .and_then(|fruit| Ok((fruit, factory.catalog.get(successor)?.computed_radius())));
        let (fruit, pop_radius) = match built {
            Ok(built) => built,
            Err(e) => {
                log::warn!("Cannot merge tier {} into tier {}: {}", tier, successor, e);
                forget_retired(session, &report.retired);
                return Err(e);
            }
        };

        session.record_merge(tier);
        session.mark_merged(a.handle);
        session.mark_merged(b.handle);
        world.remove_body(a.handle);
        world.remove_body(b.handle);
        report.retired.extend([a.handle, b.handle]);

        world.add_body(fruit.handle);
        session.register_fruit(&fruit);
        report.successors.push(SpawnedFruit {
            handle: fruit.handle,
            tier: successor,
            pos,
        });
        log::debug!("Merged tier {} at ({:.0}, {:.0}) -> tier {}", tier, pos.x, pos.y, successor);

        let pop_id = session.next_pop_id();
        session.schedule(config.pop_effect_ticks, DeferredKind::ExpirePop { id: pop_id });
        session.push_event(GameEvent::PopSpawned {
            id: pop_id,
            pos,
            radius: pop_radius,
        });
        session.push_event(GameEvent::Merged {
            tier: successor,
            pos,
        });

        session.score = calculate_score(&session.merge_counts, &factory.catalog);
        session.push_event(GameEvent::ScoreChanged {
            score: session.score,
        });
    }

    forget_retired(session, &report.retired);
    report.score_delta = session.score.saturating_sub(score_before);
    Ok(report)
}

fn forget_retired(session: &mut GameSession, retired: &[BodyHandle]) {
    for handle in retired {
        session.forget_fruit(*handle);
    }
}
