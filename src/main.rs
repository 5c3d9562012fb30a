//! Fruit Merge entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, PointerEvent};

    use fruit_merge::audio::AudioManager;
    use fruit_merge::consts::*;
    use fruit_merge::persistence::{LocalStorage, MemoryStorage, Storage};
    use fruit_merge::platform::{HeadlessWorld, PhysicsWorld, UiSink};
    use fruit_merge::sim::{FruitCatalog, Game, GamePhase, TickInput};
    use fruit_merge::{DeviceTier, GameConfig, HighscoreStore, Settings};

    /// DOM-backed UI; every write is skipped when its element is missing
    struct DomUi {
        document: Document,
    }

    impl DomUi {
        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }
    }

    impl UiSink for DomUi {
        fn set_score(&mut self, score: u64) {
            self.set_text("score", &score.to_string());
        }

        fn set_highscore(&mut self, highscore: u64) {
            self.set_text("highscore", &highscore.to_string());
        }

        fn show_end_screen(&mut self, visible: bool, title: &str) {
            if let Some(el) = self.document.get_element_by_id("end-screen") {
                let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
            }
            if visible {
                self.set_text("end-title", title);
            }
        }

        fn set_next_fruit(&mut self, image: &str) {
            if let Some(el) = self.document.get_element_by_id("next-fruit") {
                let _ = el.set_attribute("src", &format!("assets/img/{}.png", image));
            }
        }
    }

    /// Page-level state around the game core
    struct App {
        game: Game<HeadlessWorld>,
        storage: Box<dyn Storage>,
        ui: DomUi,
        audio: AudioManager,
        ctx: Option<CanvasRenderingContext2d>,
        canvas: HtmlCanvasElement,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
    }

    impl App {
        fn update(&mut self, dt: f32) {
            // Cap to avoid a burst of steps after a hidden tab
            self.accumulator += dt.min(0.25);

            let mut steps = 0;
            while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
                let input = std::mem::take(&mut self.input);
                if let Err(e) = self.game.tick(&input, SIM_DT, self.storage.as_mut()) {
                    log::error!("Tick failed: {}", e);
                }
                self.accumulator -= SIM_DT;
                steps += 1;
            }
            if steps == MAX_SUBSTEPS {
                self.accumulator = 0.0;
            }

            self.game.dispatch_events(&mut self.ui, &mut self.audio);
        }

        fn render(&self) {
            let Some(ctx) = &self.ctx else { return };
            let config = &self.game.config;
            let scale = self.canvas.width() as f64 / config.container_width as f64;

            ctx.set_transform(scale, 0.0, 0.0, scale, 0.0, 0.0).ok();
            ctx.clear_rect(
                0.0,
                0.0,
                config.container_width as f64,
                config.container_height as f64,
            );

            // Lose line
            ctx.set_stroke_style_str("#e05050");
            ctx.begin_path();
            ctx.move_to(config.wall_pad as f64, config.lose_height as f64);
            ctx.line_to(
                (config.container_width - config.wall_pad) as f64,
                config.lose_height as f64,
            );
            ctx.stroke();

            let catalog = &self.game.factory.catalog;
            for handle in self.game.world.bodies() {
                let Some(view) = self.game.world.body(handle) else {
                    continue;
                };
                let Some(tag) = self.game.session.fruit(handle) else {
                    continue;
                };
                let Ok(tier) = catalog.get(tag.tier_index) else {
                    continue;
                };
                let hue = tag.tier_index as f64 * 360.0 / catalog.len().max(1) as f64;
                ctx.set_fill_style_str(&format!("hsl({hue}, 70%, 55%)"));
                ctx.begin_path();
                ctx.arc(
                    view.position.x as f64,
                    view.position.y as f64,
                    tier.display_radius() as f64,
                    0.0,
                    std::f64::consts::TAU,
                )
                .ok();
                ctx.fill();
            }
        }

        /// Pointer position in container coordinates
        fn to_container_x(&self, client_x: i32) -> f32 {
            let rect = self.canvas.get_bounding_client_rect();
            if rect.width() <= 0.0 {
                return self.game.config.container_width / 2.0;
            }
            let t = (client_x as f64 - rect.left()) / rect.width();
            t as f32 * self.game.config.container_width
        }
    }

    fn open_storage() -> Box<dyn Storage> {
        match LocalStorage::open() {
            Some(storage) => Box::new(storage),
            None => {
                log::warn!("LocalStorage unavailable - progress will not be saved");
                Box::new(MemoryStorage::new())
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Fruit Merge starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        let ctx = canvas
            .get_context("2d")?
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());

        let mut storage = open_storage();
        let device_tier = if window.device_pixel_ratio() > 2.0 {
            DeviceTier::Constrained
        } else {
            DeviceTier::Standard
        };
        // A tier the player already has stored beats detection
        let settings = Settings::load_for_device(storage.as_ref(), device_tier);
        if let Err(e) = settings.save(storage.as_mut()) {
            log::warn!("Could not save settings: {}", e);
        }
        let highscores = HighscoreStore::load_or_init(storage.as_mut());

        let config = GameConfig {
            seed: js_sys::Date::now() as u64,
            ..Default::default()
        };
        canvas.set_width(config.container_width as u32);
        canvas.set_height(config.container_height as u32);

        let world = HeadlessWorld::with_container(&config);
        let mut game = Game::new(world, FruitCatalog::default(), &settings, config, highscores);
        let mut ui = DomUi {
            document: document.clone(),
        };
        ui.set_highscore(game.highscores.highscore());
        ui.show_end_screen(false, "");
        // Nothing to wait for in the menu; go straight to the settling delay
        game.start();

        let app = Rc::new(RefCell::new(App {
            game,
            storage,
            ui,
            audio: AudioManager::new(settings.sfx_volume),
            ctx,
            canvas: canvas.clone(),
            accumulator: 0.0,
            last_time: 0.0,
            input: TickInput::default(),
        }));

        setup_input_handlers(&canvas, app.clone());
        setup_restart_button(&document, app.clone());
        request_animation_frame(app);

        log::info!("Fruit Merge running!");
        Ok(())
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        // Aim
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut a = app.borrow_mut();
                let x = a.to_container_x(event.client_x());
                a.input.pointer_x = Some(x);
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release drops the fruit
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut a = app.borrow_mut();
                a.audio.resume();
                let x = a.to_container_x(event.client_x());
                a.input.pointer_x = Some(x);
                a.input.drop = true;
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_restart_button(document: &Document, app: Rc<RefCell<App>>) {
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                if a.game.phase() == GamePhase::Lose {
                    a.input.restart = true;
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut a = app.borrow_mut();

            let dt = if a.last_time > 0.0 {
                ((time - a.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            a.last_time = time;

            a.update(dt);
            a.render();
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless autoplay: drops fruit at random until the run is lost
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use fruit_merge::audio::LogSound;
    use fruit_merge::consts::SIM_DT;
    use fruit_merge::persistence::MemoryStorage;
    use fruit_merge::platform::{HeadlessWorld, NullUi};
    use fruit_merge::sim::{FruitCatalog, Game, GamePhase, TickInput};
    use fruit_merge::{GameConfig, HighscoreStore, Settings};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    /// Ticks between drop attempts
    const DROP_EVERY: u64 = 40;
    /// Give up after ten simulated minutes
    const MAX_TICKS: u64 = 60 * 60 * 10;

    env_logger::init();
    log::info!("Fruit Merge (native) starting headless autoplay...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(42);

    let mut storage = MemoryStorage::new();
    let settings = Settings::load(&storage);
    let highscores = HighscoreStore::load_or_init(&mut storage);
    let config = GameConfig {
        seed,
        ..Default::default()
    };
    let world = HeadlessWorld::with_container(&config);
    let width = config.container_width;
    let mut game = Game::new(world, FruitCatalog::default(), &settings, config, highscores);
    let mut aim = Pcg32::seed_from_u64(seed ^ 0x5eed);
    let mut ui = NullUi;
    let mut sound = LogSound::default();

    let mut input = TickInput {
        start: true,
        ..Default::default()
    };
    let mut ticks = 0;
    while ticks < MAX_TICKS && game.phase() != GamePhase::Lose {
        if ticks % DROP_EVERY == 0 && game.phase() == GamePhase::Ready {
            input.pointer_x = Some(aim.random_range(0.0..width));
            input.drop = true;
        }
        if let Err(e) = game.tick(&input, SIM_DT, &mut storage) {
            log::error!("Tick failed: {}", e);
            break;
        }
        game.dispatch_events(&mut ui, &mut sound);
        input = TickInput::default();
        ticks += 1;
    }

    log::info!(
        "Finished after {} ticks in {:?}: score {}, highscore {}, {} merges, {} sounds",
        ticks,
        game.phase(),
        game.session.score,
        game.highscores.highscore(),
        game.session.total_merges(),
        sound.played
    );
    println!(
        "seed {} -> score {} ({} merges)",
        seed,
        game.session.score,
        game.session.total_merges()
    );
}
