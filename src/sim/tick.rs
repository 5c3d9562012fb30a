//! Fixed timestep game loop
//!
//! Drives the session state machine:
//! `Menu -> Ready -> Drop -> Ready -> ... -> Lose`, and `Lose -> Menu -> Ready`
//! on restart. Timed transitions go through generation-tagged deferred
//! events so a restart silently invalidates anything still pending.

use glam::Vec2;

use super::body::FruitFactory;
use super::catalog::FruitCatalog;
use super::merge::{MergeReport, resolve_merge_batch};
use super::state::{DeferredKind, GameEvent, GamePhase, GameSession};
use crate::GameConfig;
use crate::error::Result;
use crate::highscores::{HighscoreStore, calculate_score};
use crate::persistence::Storage;
use crate::platform::{BodyConfig, PhysicsWorld, SoundSink, UiSink};
use crate::settings::Settings;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer x in container coordinates
    pub pointer_x: Option<f32>,
    /// Pointer released: drop the current fruit
    pub drop: bool,
    /// Leave the menu
    pub start: bool,
    /// Start over after losing
    pub restart: bool,
}

/// A running game: session, fruit factory and the physics world
pub struct Game<W: PhysicsWorld> {
    pub session: GameSession,
    pub factory: FruitFactory,
    pub config: GameConfig,
    pub world: W,
    pub highscores: HighscoreStore,
    /// Last known pointer x, used to place the preview and drops
    aim_x: f32,
}

impl<W: PhysicsWorld> Game<W> {
    pub fn new(
        world: W,
        catalog: FruitCatalog,
        settings: &Settings,
        config: GameConfig,
        highscores: HighscoreStore,
    ) -> Self {
        let mut session = GameSession::new(config.seed, catalog.len(), config.spawnable_tiers);
        session.highscore = highscores.highscore();
        let factory = FruitFactory::new(catalog, settings.device_tier, &config);
        let aim_x = config.container_width / 2.0;
        Self {
            session,
            factory,
            config,
            world,
            highscores,
            aim_x,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    /// Leave the menu; input opens up after the settling delay
    pub fn start(&mut self) {
        if self.session.phase != GamePhase::Menu || self.awaiting_ready() {
            return;
        }
        log::info!("Starting run (generation {})", self.session.generation);
        self.session
            .schedule(self.config.settle_ticks, DeferredKind::EnterReady);
        self.session.push_event(GameEvent::NextFruit {
            tier: self.session.next_tier,
        });
        self.session.push_event(GameEvent::ScoreChanged {
            score: self.session.score,
        });
    }

    fn awaiting_ready(&self) -> bool {
        self.session.pending.iter().any(|e| {
            e.kind == DeferredKind::EnterReady && e.generation == self.session.generation
        })
    }

    /// Clear the board after a loss and head back to `Ready` via the settling delay
    pub fn restart(&mut self) {
        if self.session.phase != GamePhase::Lose {
            log::debug!("Ignoring restart in {:?}", self.session.phase);
            return;
        }

        for handle in self.world.bodies() {
            let is_static = self.world.body(handle).is_some_and(|b| b.is_static);
            if !is_static {
                self.world.remove_body(handle);
            }
        }
        if let Some(preview) = self.session.preview {
            self.world.remove_body(preview);
        }

        self.session.reset_run();
        self.session.phase = GamePhase::Menu;
        self.session.push_event(GameEvent::Restarted);
        log::info!("Run restarted (generation {})", self.session.generation);
        self.start();
    }

    /// Drop the current fruit. Ignored unless `Ready`.
    pub fn request_drop(&mut self) -> Result<bool> {
        if self.session.phase != GamePhase::Ready {
            log::debug!("Drop ignored in {:?}", self.session.phase);
            return Ok(false);
        }

        self.remove_preview();

        let tier = self.session.advance_queue();
        let x = self.clamped_x(tier)?;
        let fruit = self.factory.create_fruit_body(
            &mut self.world,
            x,
            self.config.drop_height,
            tier,
            BodyConfig::default(),
        )?;
        self.world.add_body(fruit.handle);
        self.session.register_fruit(&fruit);

        self.session.phase = GamePhase::Drop;
        self.session
            .schedule(self.config.drop_cooldown_ticks, DeferredKind::EndDropCooldown);

        self.session.score = calculate_score(&self.session.merge_counts, &self.factory.catalog);
        self.session.push_event(GameEvent::Dropped { tier, x });
        self.session.push_event(GameEvent::NextFruit {
            tier: self.session.next_tier,
        });
        self.session.push_event(GameEvent::ScoreChanged {
            score: self.session.score,
        });
        Ok(true)
    }

    /// Advance the game by one fixed timestep
    pub fn tick(&mut self, input: &TickInput, dt: f32, storage: &mut dyn Storage) -> Result<()> {
        self.session.time_ticks += 1;
        if input.restart {
            self.restart();
        }
        if input.start {
            self.start();
        }

        for kind in self.session.take_due() {
            self.apply_deferred(kind)?;
        }

        if let Some(x) = input.pointer_x {
            self.aim_x = x;
            self.move_preview()?;
        }

        if input.drop {
            self.request_drop()?;
        }

        // No stepping once the run is over
        if self.session.phase == GamePhase::Lose {
            return Ok(());
        }

        let pairs = self.world.step(dt);
        let report = resolve_merge_batch(
            &pairs,
            &mut self.world,
            &mut self.session,
            &mut self.factory,
            &self.config,
        )?;
        if report.lost {
            self.on_lose(&report, storage);
        }
        Ok(())
    }

    fn apply_deferred(&mut self, kind: DeferredKind) -> Result<()> {
        match kind {
            DeferredKind::EnterReady => {
                if self.session.phase == GamePhase::Menu {
                    self.session.phase = GamePhase::Ready;
                    self.spawn_preview()?;
                    log::debug!("Ready");
                }
            }
            DeferredKind::EndDropCooldown => {
                if self.session.phase == GamePhase::Drop {
                    self.session.phase = GamePhase::Ready;
                    self.spawn_preview()?;
                }
            }
            DeferredKind::ExpirePop { id } => {
                self.session.push_event(GameEvent::PopExpired { id });
            }
        }
        Ok(())
    }

    fn on_lose(&mut self, report: &MergeReport, storage: &mut dyn Storage) {
        self.remove_preview();

        let score = calculate_score(&self.session.merge_counts, &self.factory.catalog);
        self.session.score = score;
        let new_highscore = match self.highscores.save_highscore(score, storage) {
            Ok(update) => {
                self.session.highscore = update.highscore;
                update.is_new
            }
            Err(e) => {
                log::warn!("Could not save highscore: {}", e);
                false
            }
        };

        log::info!(
            "Game over: score {} after {} merges ({} in the final tick)",
            score,
            self.session.total_merges(),
            report.merges()
        );
        self.session.push_event(GameEvent::Lost {
            score,
            new_highscore,
        });
    }

    /// x for a fruit of `tier`, kept clear of the side walls
    fn clamped_x(&self, tier: usize) -> Result<f32> {
        let radius = self.factory.catalog.get(tier)?.computed_radius();
        let (min, max) = self.config.drop_range(radius);
        Ok(self.aim_x.clamp(min, max))
    }

    fn spawn_preview(&mut self) -> Result<()> {
        self.remove_preview();
        let tier = self.session.current_tier;
        let x = self.clamped_x(tier)?;
        let preview = self.factory.create_fruit_body(
            &mut self.world,
            x,
            self.config.drop_height,
            tier,
            BodyConfig::preview(),
        )?;
        self.world.add_body(preview.handle);
        self.session.preview = Some(preview.handle);
        Ok(())
    }

    fn move_preview(&mut self) -> Result<()> {
        if let Some(preview) = self.session.preview {
            let x = self.clamped_x(self.session.current_tier)?;
            self.world
                .set_position(preview, Vec2::new(x, self.config.drop_height));
        }
        Ok(())
    }

    fn remove_preview(&mut self) {
        if let Some(preview) = self.session.preview.take() {
            self.world.remove_body(preview);
        }
    }

    /// Hand queued events to the UI and audio collaborators
    pub fn dispatch_events(&mut self, ui: &mut dyn UiSink, sound: &mut dyn SoundSink) {
        for event in std::mem::take(&mut self.session.events) {
            match event {
                GameEvent::Merged { .. } => sound.play("pop"),
                GameEvent::Dropped { .. } => sound.play("drop"),
                GameEvent::ScoreChanged { score } => ui.set_score(score),
                GameEvent::NextFruit { tier } => {
                    if let Ok(next) = self.factory.catalog.get(tier) {
                        ui.set_next_fruit(&next.name);
                    }
                }
                GameEvent::Lost {
                    new_highscore,
                    score,
                } => {
                    ui.set_score(score);
                    ui.set_highscore(self.session.highscore);
                    let title = if new_highscore {
                        "New Highscore!"
                    } else {
                        "Game Over!"
                    };
                    ui.show_end_screen(true, title);
                    sound.play(if new_highscore { "highscore" } else { "gameover" });
                }
                GameEvent::Restarted => {
                    ui.show_end_screen(false, "");
                    ui.set_score(0);
                }
                GameEvent::PopSpawned { .. } | GameEvent::PopExpired { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::persistence::MemoryStorage;
    use crate::platform::{BodyHandle, HeadlessWorld, NullSound};

    fn new_game() -> Game<HeadlessWorld> {
        let config = GameConfig {
            seed: 12345,
            ..Default::default()
        };
        Game::new(
            HeadlessWorld::with_container(&config),
            FruitCatalog::default(),
            &Settings::default(),
            config,
            HighscoreStore::default(),
        )
    }

    fn run(game: &mut Game<HeadlessWorld>, storage: &mut MemoryStorage, ticks: u64) {
        for _ in 0..ticks {
            game.tick(&TickInput::default(), SIM_DT, storage).unwrap();
        }
    }

    fn dynamic_bodies(game: &Game<HeadlessWorld>) -> Vec<BodyHandle> {
        game.world
            .bodies()
            .into_iter()
            .filter(|&h| !game.world.body(h).unwrap().is_static)
            .collect()
    }

    fn ready_game(storage: &mut MemoryStorage) -> Game<HeadlessWorld> {
        let mut game = new_game();
        let start = TickInput {
            start: true,
            ..Default::default()
        };
        game.tick(&start, SIM_DT, storage).unwrap();
        let settle_ticks = game.config.settle_ticks;
        run(&mut game, storage, settle_ticks);
        assert_eq!(game.phase(), GamePhase::Ready);
        game
    }

    #[derive(Default)]
    struct RecordingUi {
        score: Option<u64>,
        end_title: Option<String>,
        next: Option<String>,
    }

    impl UiSink for RecordingUi {
        fn set_score(&mut self, score: u64) {
            self.score = Some(score);
        }
        fn show_end_screen(&mut self, visible: bool, title: &str) {
            self.end_title = visible.then(|| title.to_string());
        }
        fn set_next_fruit(&mut self, image: &str) {
            self.next = Some(image.to_string());
        }
    }

    #[test]
    fn test_menu_to_ready_after_settling() {
        let mut storage = MemoryStorage::new();
        let mut game = new_game();
        run(&mut game, &mut storage, 100);
        assert_eq!(game.phase(), GamePhase::Menu);

        let start = TickInput {
            start: true,
            ..Default::default()
        };
        game.tick(&start, SIM_DT, &mut storage).unwrap();
        assert_eq!(game.phase(), GamePhase::Menu);
        // Starting twice does not schedule twice
        game.start();
        assert_eq!(game.session.pending.len(), 1);

        let settle_ticks = game.config.settle_ticks;

        run(&mut game, &mut storage, settle_ticks - 1);
        assert_eq!(game.phase(), GamePhase::Menu);
        run(&mut game, &mut storage, 1);
        assert_eq!(game.phase(), GamePhase::Ready);
        assert!(game.session.preview.is_some());
    }

    #[test]
    fn test_drop_and_cooldown() {
        let mut storage = MemoryStorage::new();
        let mut game = ready_game(&mut storage);
        let queued_next = game.session.next_tier;
        let current = game.session.current_tier;

        let drop = TickInput {
            pointer_x: Some(300.0),
            drop: true,
            ..Default::default()
        };
        game.tick(&drop, SIM_DT, &mut storage).unwrap();
        assert_eq!(game.phase(), GamePhase::Drop);
        assert_eq!(game.session.current_tier, queued_next);
        assert!(game.session.preview.is_none());

        let dropped = dynamic_bodies(&game);
        assert_eq!(dropped.len(), 1);
        assert_eq!(game.session.fruit(dropped[0]).unwrap().tier_index, current);

        // Drop requests during the cooldown are rejected, not queued
        game.tick(&drop, SIM_DT, &mut storage).unwrap();
        assert_eq!(dynamic_bodies(&game).len(), 1);

        let drop_cooldown_ticks = game.config.drop_cooldown_ticks;

        run(&mut game, &mut storage, drop_cooldown_ticks);
        assert_eq!(game.phase(), GamePhase::Ready);
        assert!(game.session.preview.is_some());
        assert_eq!(dynamic_bodies(&game).len(), 1);
    }

    #[test]
    fn test_drop_ignored_outside_ready() {
        let mut game = new_game();
        assert!(!game.request_drop().unwrap());
        assert!(dynamic_bodies(&game).is_empty());
    }

    #[test]
    fn test_drop_clamped_to_container() {
        let mut storage = MemoryStorage::new();
        let mut game = ready_game(&mut storage);
        let tier = game.session.current_tier;
        let drop = TickInput {
            pointer_x: Some(-500.0),
            drop: true,
            ..Default::default()
        };
        game.tick(&drop, SIM_DT, &mut storage).unwrap();

        let radius = game.factory.catalog.get(tier).unwrap().computed_radius();
        let handle = dynamic_bodies(&game)[0];
        let x = game.world.body(handle).unwrap().position.x;
        assert!(x > game.config.wall_pad + radius);
        assert!((x - game.config.drop_range(radius).0).abs() < 1e-3);
        // Not touching the wall, so the run goes on
        assert_eq!(game.phase(), GamePhase::Drop);
    }

    #[test]
    fn test_preview_follows_pointer() {
        let mut storage = MemoryStorage::new();
        let mut game = ready_game(&mut storage);
        let aim = TickInput {
            pointer_x: Some(250.0),
            ..Default::default()
        };
        game.tick(&aim, SIM_DT, &mut storage).unwrap();
        let preview = game.session.preview.unwrap();
        assert_eq!(game.world.body(preview).unwrap().position.x, 250.0);
    }

    /// Stack fruit until the pile crosses the lose line
    fn play_until_lost(game: &mut Game<HeadlessWorld>, storage: &mut MemoryStorage) {
        let drop = TickInput {
            pointer_x: Some(320.0),
            drop: true,
            ..Default::default()
        };
        for _ in 0..20_000 {
            if game.phase() == GamePhase::Lose {
                return;
            }
            game.tick(&drop, SIM_DT, storage).unwrap();
        }
        panic!("run never ended");
    }

    #[test]
    fn test_lose_and_restart() {
        let mut storage = MemoryStorage::new();
        let mut game = ready_game(&mut storage);
        play_until_lost(&mut game, &mut storage);

        assert_eq!(game.phase(), GamePhase::Lose);
        assert!(game.session.preview.is_none());
        assert!(game.session.highscore >= game.session.score);
        let saved = HighscoreStore::load(&mut storage).unwrap();
        assert_eq!(saved.highscore(), game.session.highscore);

        // Input and stepping are off
        let bodies = game.world.bodies();
        game.tick(
            &TickInput {
                drop: true,
                ..Default::default()
            },
            SIM_DT,
            &mut storage,
        )
        .unwrap();
        assert_eq!(game.world.bodies(), bodies);

        let mut ui = RecordingUi::default();
        game.dispatch_events(&mut ui, &mut NullSound);
        assert!(ui.end_title.is_some());

        let restart = TickInput {
            restart: true,
            ..Default::default()
        };
        game.tick(&restart, SIM_DT, &mut storage).unwrap();
        assert!(dynamic_bodies(&game).is_empty());
        assert_eq!(game.session.score, 0);
        assert_eq!(game.session.total_merges(), 0);
        assert_eq!(game.phase(), GamePhase::Menu);

        let settle_ticks = game.config.settle_ticks;

        run(&mut game, &mut storage, settle_ticks);
        assert_eq!(game.phase(), GamePhase::Ready);

        game.dispatch_events(&mut ui, &mut NullSound);
        assert_eq!(ui.end_title, None);
        assert_eq!(ui.score, Some(0));
    }

    #[test]
    fn test_stale_cooldown_after_restart() {
        let mut storage = MemoryStorage::new();
        let mut game = ready_game(&mut storage);
        game.config.drop_cooldown_ticks = 5;
        game.request_drop().unwrap();
        assert_eq!(game.phase(), GamePhase::Drop);

        // Force a loss while the cooldown is pending, then restart at once
        game.session.phase = GamePhase::Lose;
        game.restart();
        assert_eq!(game.phase(), GamePhase::Menu);

        // The old cooldown comes due before the settling delay ends
        // and must not move the new run anywhere
        let settle_ticks = game.config.settle_ticks;
        run(&mut game, &mut storage, settle_ticks - 1);
        assert_eq!(game.phase(), GamePhase::Menu);
        run(&mut game, &mut storage, 1);
        assert_eq!(game.phase(), GamePhase::Ready);
        assert!(game.session.pending.is_empty());
    }

    #[test]
    fn test_dispatch_next_fruit_and_score() {
        let mut storage = MemoryStorage::new();
        let mut game = ready_game(&mut storage);
        game.request_drop().unwrap();
        let next = game.session.next_tier;

        let mut ui = RecordingUi::default();
        game.dispatch_events(&mut ui, &mut NullSound);
        assert_eq!(
            ui.next.as_deref(),
            Some(game.factory.catalog.get(next).unwrap().name.as_str())
        );
        assert_eq!(ui.score, Some(0));
        assert!(game.session.events.is_empty());
    }

    #[test]
    fn test_determinism() {
        let mut storage1 = MemoryStorage::new();
        let mut storage2 = MemoryStorage::new();
        let mut game1 = ready_game(&mut storage1);
        let mut game2 = ready_game(&mut storage2);

        let inputs = [
            TickInput {
                pointer_x: Some(200.0),
                drop: true,
                ..Default::default()
            },
            TickInput::default(),
            TickInput {
                pointer_x: Some(420.0),
                ..Default::default()
            },
        ];
        for _ in 0..200 {
            for input in &inputs {
                game1.tick(input, SIM_DT, &mut storage1).unwrap();
                game2.tick(input, SIM_DT, &mut storage2).unwrap();
            }
        }

        assert_eq!(game1.session.merge_counts, game2.session.merge_counts);
        assert_eq!(game1.session.current_tier, game2.session.current_tier);
        assert_eq!(game1.world.bodies(), game2.world.bodies());
    }
}
