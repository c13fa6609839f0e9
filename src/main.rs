//! Erase Box entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, EventTarget, HtmlCanvasElement, KeyboardEvent,
        MouseEvent, TouchEvent,
    };

    use erase_box::advice::advice_or_fallback;
    use erase_box::consts::TILE_SIZE;
    use erase_box::level::{Level, catalog_from_json};
    use erase_box::sim::{BodyKind, EffectKind, TickInput};
    use erase_box::{Game, GameObserver, Tuning};

    const LEVELS_JSON: &str = include_str!("../assets/levels.json");

    const CELEBRATION_PALETTE: [&str; 6] = [
        "#ff595e", "#ffca3a", "#8ac926", "#1982c4", "#6a4c93", "#ffffff",
    ];

    /// Collects callbacks until the frame loop gets to them
    #[derive(Default)]
    struct WebObserver {
        completed: Option<u32>,
        game_over: Option<String>,
    }

    impl GameObserver for WebObserver {
        fn on_level_complete(&mut self, coins_collected: u32) {
            self.completed = Some(coins_collected);
        }

        fn on_game_over(&mut self, reason: &str) {
            self.game_over = Some(reason.to_string());
        }
    }

    type Listener = (EventTarget, &'static str, Closure<dyn FnMut(web_sys::Event)>);

    /// Browser shell around the platform-free game
    struct WebGame {
        game: Game<WebObserver>,
        levels: Vec<Level>,
        current: usize,
        keys: TickInput,
        document: Document,
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
        listeners: Vec<Listener>,
        frame_handle: Option<i32>,
        torn_down: bool,
    }

    impl WebGame {
        fn load_level(&mut self, index: usize) -> Result<(), JsValue> {
            let Some(level) = self.levels.get(index) else {
                return Err(JsValue::from_str("no such level"));
            };
            self.game
                .start_level(level)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            self.current = index;
            self.keys = TickInput::default();

            if let Some(session) = self.game.session() {
                self.canvas.set_width(session.playfield.x as u32);
                self.canvas.set_height(session.playfield.y as u32);
            }
            set_text(&self.document, "hud-level", &level.name);
            set_class(&self.document, "message", "hidden");
            log::info!("Playing level {} '{}'", level.id, level.name);
            Ok(())
        }

        fn on_key(&mut self, event: &KeyboardEvent, down: bool) {
            let key = event.key();
            match key.as_str() {
                "ArrowLeft" | "a" | "A" => self.keys.left = down,
                "ArrowRight" | "d" | "D" => self.keys.right = down,
                "ArrowUp" | "w" | "W" | " " => self.keys.jump = down,
                "Escape" if down => {
                    self.game.toggle_pause();
                }
                "r" | "R" if down => {
                    if let Err(e) = self.load_level(self.current) {
                        log::error!("Restart failed: {:?}", e);
                    }
                }
                _ => return,
            }
            event.prevent_default();
            self.game.set_input(self.keys);
        }

        /// Place a block under a viewport position
        fn on_pointer(&mut self, client_x: f64, client_y: f64) {
            let rect = self.canvas.get_bounding_client_rect();
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                return;
            }
            let scale_x = self.canvas.width() as f64 / rect.width();
            let scale_y = self.canvas.height() as f64 / rect.height();
            let point = Vec2::new(
                ((client_x - rect.left()) * scale_x) as f32,
                ((client_y - rect.top()) * scale_y) as f32,
            );
            self.game.place_block_at(point);
        }

        /// React to observer callbacks delivered during the last frame
        fn after_frame(&mut self) {
            if let Some(coins) = self.game.observer_mut().completed.take() {
                let advice = advice_or_fallback(None, coins);
                let next = (self.current + 1) % self.levels.len().max(1);
                if let Err(e) = self.load_level(next) {
                    log::error!("Could not load next level: {:?}", e);
                }
                self.show_message(&format!("Level clear with {} coins! {}", coins, advice));
            }
            if let Some(reason) = self.game.observer_mut().game_over.take() {
                self.show_message(&format!("{} Press R to retry.", reason));
            }
        }

        fn show_message(&self, text: &str) {
            set_text(&self.document, "message", text);
            set_class(&self.document, "message", "");
        }

        fn draw(&self) {
            let ctx = &self.ctx;
            ctx.set_fill_style_str("#22223b");
            ctx.fill_rect(0.0, 0.0, self.canvas.width() as f64, self.canvas.height() as f64);

            for body in self.game.snapshots() {
                let p = body.position;
                match body.kind {
                    BodyKind::Wall => fill_square(ctx, "#4a4e69", p, TILE_SIZE),
                    BodyKind::Block { placed: false } => fill_square(ctx, "#c9ada7", p, TILE_SIZE - 2.0),
                    BodyKind::Block { placed: true } => fill_square(ctx, "#f2a65a", p, TILE_SIZE - 2.0),
                    BodyKind::Coin => fill_circle(ctx, "#ffd166", p, TILE_SIZE / 4.0),
                    BodyKind::Chest => fill_square(ctx, "#8d5524", p, TILE_SIZE * 0.8),
                    BodyKind::Player => fill_square(ctx, "#06d6a0", p, TILE_SIZE * 0.7),
                    BodyKind::DeathPlane => {}
                }
            }

            for particle in self.game.particles() {
                let color = match particle.kind {
                    EffectKind::Celebration => CELEBRATION_PALETTE[particle.color as usize % CELEBRATION_PALETTE.len()],
                    EffectKind::Debris => "#c9ada7",
                    EffectKind::Placement => "#f2e9e4",
                };
                fill_square(ctx, color, particle.pos, 4.0);
            }
        }

        fn update_hud(&self) {
            let Some(hud) = self.game.hud() else {
                return;
            };
            set_text(&self.document, "hud-coins", &hud.coins_remaining.to_string());
            set_text(&self.document, "hud-blocks", &hud.blocks_remaining.to_string());
            set_class(&self.document, "pause-menu", if hud.paused { "" } else { "hidden" });
            set_class(&self.document, "clear-banner", if hud.clearing { "" } else { "hidden" });
        }

        fn listen(
            &mut self,
            target: &EventTarget,
            event: &'static str,
            handler: impl FnMut(web_sys::Event) + 'static,
        ) -> Result<(), JsValue> {
            let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
            self.listeners.push((target.clone(), event, closure));
            Ok(())
        }

        /// Stop the loop, detach every listener and release the level
        fn teardown(&mut self) {
            if self.torn_down {
                return;
            }
            self.torn_down = true;
            if let (Some(handle), Some(window)) = (self.frame_handle.take(), web_sys::window()) {
                let _ = window.cancel_animation_frame(handle);
            }
            for (target, event, closure) in self.listeners.drain(..) {
                let _ = target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
            }
            self.game.teardown();
            log::info!("Erase Box stopped");
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_class(document: &Document, id: &str, class: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", class);
        }
    }

    fn fill_square(ctx: &CanvasRenderingContext2d, color: &str, center: Vec2, size: f32) {
        ctx.set_fill_style_str(color);
        let half = size / 2.0;
        ctx.fill_rect(
            (center.x - half) as f64,
            (center.y - half) as f64,
            size as f64,
            size as f64,
        );
    }

    fn fill_circle(ctx: &CanvasRenderingContext2d, color: &str, center: Vec2, radius: f32) {
        ctx.set_fill_style_str(color);
        ctx.begin_path();
        let _ = ctx.arc(
            center.x as f64,
            center.y as f64,
            radius as f64,
            0.0,
            std::f64::consts::TAU,
        );
        ctx.fill();
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Erase Box starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into()?;

        let levels = catalog_from_json(LEVELS_JSON).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let seed = js_sys::Date::now() as u64;
        log::info!("Game initialized with seed: {}", seed);

        let web = Rc::new(RefCell::new(WebGame {
            game: Game::new(WebObserver::default(), Tuning::default()).with_seed(seed),
            levels,
            current: 0,
            keys: TickInput::default(),
            document: document.clone(),
            canvas: canvas.clone(),
            ctx,
            listeners: Vec::new(),
            frame_handle: None,
            torn_down: false,
        }));
        web.borrow_mut().load_level(0)?;

        setup_input_handlers(&web, &window, &canvas)?;

        // Kept outside the detachable set: it is the one doing the detaching
        {
            let web = web.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                web.borrow_mut().teardown();
            });
            window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        request_animation_frame(web);

        log::info!("Erase Box running!");
        Ok(())
    }

    fn setup_input_handlers(
        web: &Rc<RefCell<WebGame>>,
        window: &web_sys::Window,
        canvas: &HtmlCanvasElement,
    ) -> Result<(), JsValue> {
        let mut w = web.borrow_mut();

        for (event, down) in [("keydown", true), ("keyup", false)] {
            let game = web.clone();
            w.listen(window, event, move |event: web_sys::Event| {
                if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                    game.borrow_mut().on_key(key, down);
                }
            })?;
        }

        {
            let game = web.clone();
            w.listen(canvas, "mousedown", move |event: web_sys::Event| {
                if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                    game.borrow_mut()
                        .on_pointer(mouse.client_x() as f64, mouse.client_y() as f64);
                }
            })?;
        }

        {
            let game = web.clone();
            w.listen(canvas, "touchstart", move |event: web_sys::Event| {
                event.prevent_default();
                let Some(touch) = event
                    .dyn_ref::<TouchEvent>()
                    .and_then(|t| t.touches().get(0))
                else {
                    return;
                };
                game.borrow_mut()
                    .on_pointer(touch.client_x() as f64, touch.client_y() as f64);
            })?;
        }

        {
            let game = web.clone();
            w.listen(window, "blur", move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                g.keys = TickInput::default();
                g.game.set_input(TickInput::default());
                g.game.set_paused(true);
                log::info!("Auto-paused (window blur)");
            })?;
        }

        Ok(())
    }

    fn request_animation_frame(web: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let next = web.clone();
        let callback = Closure::once_into_js(move |time: f64| {
            game_loop(next, time);
        });
        match window.request_animation_frame(callback.unchecked_ref()) {
            Ok(handle) => web.borrow_mut().frame_handle = Some(handle),
            Err(e) => log::error!("requestAnimationFrame failed: {:?}", e),
        }
    }

    fn game_loop(web: Rc<RefCell<WebGame>>, time: f64) {
        {
            let mut w = web.borrow_mut();
            if w.torn_down {
                return;
            }
            w.frame_handle = None;

            w.game.frame(time);
            w.after_frame();
            w.draw();
            w.update_hud();
        }

        request_animation_frame(web);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    web_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use anyhow::{Context, Result, anyhow};

    use erase_box::advice::advice_or_fallback;
    use erase_box::level::catalog_from_json;
    use erase_box::sim::TickInput;
    use erase_box::{Game, GameObserver, Tuning};

    const LEVELS_JSON: &str = include_str!("../assets/levels.json");

    /// Frames simulated before giving up
    const MAX_FRAMES: u32 = 60 * 15;

    /// Logs observer callbacks and remembers the outcome
    #[derive(Default)]
    struct LogObserver {
        completed: Option<u32>,
        game_over: Option<String>,
    }

    impl GameObserver for LogObserver {
        fn on_level_complete(&mut self, coins_collected: u32) {
            log::info!("Level complete: {} coins", coins_collected);
            self.completed = Some(coins_collected);
        }

        fn on_game_over(&mut self, reason: &str) {
            log::warn!("Game over: {}", reason);
            self.game_over = Some(reason.to_string());
        }
    }

    /// Walk right through a catalog level with no renderer attached
    ///
    /// Usage: `erase-box [level-id] [tuning.json]`
    pub fn run() -> Result<()> {
        let mut args = std::env::args().skip(1);
        let level_id: u32 = match args.next() {
            Some(arg) => arg.parse().with_context(|| format!("invalid level id '{}'", arg))?,
            None => 1,
        };
        let tuning = match args.next() {
            Some(path) => {
                let json = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
                Tuning::from_json(&json)?
            }
            None => Tuning::default(),
        };

        let catalog = catalog_from_json(LEVELS_JSON)?;
        let level = catalog
            .iter()
            .find(|l| l.id == level_id)
            .ok_or_else(|| anyhow!("no level with id {}", level_id))?;

        let mut game = Game::new(LogObserver::default(), tuning).with_seed(u64::from(level_id));
        game.start_level(level)?;
        game.set_input(TickInput {
            right: true,
            ..TickInput::default()
        });

        let frame_ms = 1000.0 / 60.0;
        for frame in 0..MAX_FRAMES {
            game.frame(f64::from(frame) * frame_ms);

            if frame % 60 == 0 {
                if let Some(hud) = game.hud() {
                    log::info!(
                        "t={:>2}s coins left {} blocks left {} clearing {}",
                        frame / 60,
                        hud.coins_remaining,
                        hud.blocks_remaining,
                        hud.clearing
                    );
                }
            }
            if !game.is_running() || game.observer().game_over.is_some() {
                break;
            }
        }

        match (game.observer().completed, &game.observer().game_over) {
            (Some(coins), _) => println!("{}: cleared! {}", level.name, advice_or_fallback(None, coins)),
            (None, Some(reason)) => println!("{}: {}", level.name, reason),
            (None, None) => println!("{}: not cleared by walking right", level.name),
        }

        game.teardown();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Erase Box (native) starting...");
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
