//! Breakout Retro entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

    use breakout_retro::consts::*;
    use breakout_retro::renderer::SdfRenderState;
    use breakout_retro::sim::{Config, GameEvent, GamePhase, GameState, TickInput, tick};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        render_state: Option<SdfRenderState>,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        move_left: bool,
        move_right: bool,
        canvas_size: (f32, f32),
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(config: Config) -> Self {
            let state = GameState::new(config).expect("invalid game configuration");
            Self {
                state,
                render_state: None,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                move_left: false,
                move_right: false,
                canvas_size: (0.0, 0.0),
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        fn set_canvas_size(&mut self, w: f32, h: f32) {
            self.canvas_size = (w, h);
        }

        /// Map a canvas-space x coordinate into playfield coordinates,
        /// matching the letterboxed mapping the shader uses
        fn canvas_to_world_x(&self, x: f32) -> f32 {
            let (cw, ch) = self.canvas_size;
            let world_w = self.state.config.screen_width;
            let world_h = self.state.config.screen_height;
            if cw <= 0.0 || ch <= 0.0 {
                return x;
            }
            let scale = (cw / world_w).min(ch / world_h);
            let origin_x = (cw - world_w * scale) / 2.0;
            (x - origin_x) / scale
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32, time: f64) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            self.input.move_axis = match (self.move_left, self.move_right) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            };

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.clone();
                let events = tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                for event in &events {
                    match event {
                        GameEvent::GameOver => {
                            log::info!("Game over with score {}", self.state.score);
                        }
                        GameEvent::Victory => {
                            log::info!("Victory! Final score {}", self.state.score);
                        }
                        _ => {}
                    }
                }

                // Clear one-shot inputs after processing
                self.input.fire = false;
                self.input.pause = false;
                self.input.restart = false;
            }

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;

            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        /// Render the current frame
        fn render(&mut self, time: f64) {
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(&self.state, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let window = web_sys::window().unwrap();
            let document = window.document().unwrap();

            if let Some(el) = document.query_selector("#hud-score .hud-value").ok().flatten() {
                el.set_text_content(Some(&self.state.score.to_string()));
            }
            if let Some(el) = document.query_selector("#hud-lives .hud-value").ok().flatten() {
                el.set_text_content(Some(&self.state.lives.to_string()));
            }
            if let Some(el) = document.query_selector("#hud-level .hud-value").ok().flatten() {
                el.set_text_content(Some(&(self.state.level + 1).to_string()));
            }
            if let Some(el) = document.query_selector("#hud-fps .hud-value").ok().flatten() {
                el.set_text_content(Some(&self.fps.to_string()));
            }

            // Combo shows only while an actual streak is running
            if let Some(el) = document.get_element_by_id("hud-combo") {
                if self.state.combo > 1 {
                    let _ = el.set_attribute("class", "hud-item");
                    if let Some(val) = document.query_selector("#hud-combo .hud-value").ok().flatten()
                    {
                        val.set_text_content(Some(&format!("x{}", self.state.combo)));
                    }
                } else {
                    let _ = el.set_attribute("class", "hud-item hidden");
                }
            }

            // Phase overlays
            set_visible(&document, "menu-overlay", self.state.phase == GamePhase::Menu);
            set_visible(&document, "pause-overlay", self.state.phase == GamePhase::Paused);
            set_visible(&document, "game-over", self.state.phase == GamePhase::GameOver);
            set_visible(&document, "victory", self.state.phase == GamePhase::Victory);

            if self.state.phase == GamePhase::GameOver || self.state.phase == GamePhase::Victory {
                if let Some(el) = document.get_element_by_id("final-score") {
                    el.set_text_content(Some(&self.state.score.to_string()));
                }
            }
        }
    }

    fn set_visible(document: &web_sys::Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    /// Read a session configuration override from a `#game-config` JSON
    /// script tag, falling back to defaults
    fn load_config(document: &web_sys::Document) -> Config {
        if let Some(el) = document.get_element_by_id("game-config") {
            if let Some(json) = el.text_content() {
                match serde_json::from_str::<Config>(&json) {
                    Ok(config) => {
                        log::info!("Loaded configuration from #game-config");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring bad #game-config: {}", e),
                }
            }
        }
        Config::default()
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Breakout Retro starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        // Set canvas size
        let dpr = window.device_pixel_ratio();
        let client_w = canvas.client_width();
        let client_h = canvas.client_height();
        let width = (client_w as f64 * dpr) as u32;
        let height = (client_h as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        // Initialize game; seed 0 in the config means "pick one now"
        let mut config = load_config(&document);
        if config.seed == 0 {
            config.seed = js_sys::Date::now() as u64;
        }
        log::info!("Session seed: {}", config.seed);

        let game = Rc::new(RefCell::new(Game::new(config)));
        game.borrow_mut()
            .set_canvas_size(client_w as f32, client_h as f32);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to get adapter");

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let mut render_state = SdfRenderState::new(surface, &adapter, width, height).await;
        render_state.set_start_time(js_sys::Date::now());
        game.borrow_mut().render_state = Some(render_state);

        setup_input_handlers(&canvas, game.clone());
        setup_auto_pause(game.clone());

        // Start game loop
        request_animation_frame(game);

        log::info!("Breakout Retro running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse move - paddle follows the pointer
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let w = canvas_clone.client_width() as f32;
                let h = canvas_clone.client_height() as f32;
                g.set_canvas_size(w, h);
                let world_x = g.canvas_to_world_x(event.offset_x() as f32);
                g.input.pointer_x = Some(world_x);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse click - launch/fire
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().input.fire = true;
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = game.borrow_mut();
                    let w = canvas_clone.client_width() as f32;
                    let h = canvas_clone.client_height() as f32;
                    g.set_canvas_size(w, h);
                    let rect = canvas_clone.get_bounding_client_rect();
                    let x = touch.client_x() as f32 - rect.left() as f32;
                    let world_x = g.canvas_to_world_x(x);
                    g.input.pointer_x = Some(world_x);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start (launch/fire)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                game.borrow_mut().input.fire = true;
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let game = game.clone();
            let window = web_sys::window().unwrap();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => {
                        g.move_left = true;
                        // Keyboard steering overrides the pointer
                        g.input.pointer_x = None;
                    }
                    "ArrowRight" | "d" | "D" => {
                        g.move_right = true;
                        g.input.pointer_x = None;
                    }
                    " " | "Enter" => g.input.fire = true,
                    "Escape" => g.input.pause = true,
                    "r" | "R" => g.input.restart = true,
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let game = game.clone();
            let window = web_sys::window().unwrap();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => g.move_left = false,
                    "ArrowRight" | "d" | "D" => g.move_right = false,
                    _ => {}
                }
            });
            let _ =
                window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.state.phase == GamePhase::Playing {
                        g.input.pause = true;
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.state.phase == GamePhase::Playing {
                    g.input.pause = true;
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ =
                window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render(time);
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Breakout Retro (native) starting...");
    log::info!("The game ships as wasm - run with `trunk serve` for the web version");

    // Headless smoke run of the simulation
    run_headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn run_headless_demo() {
    use breakout_retro::consts::SIM_DT;
    use breakout_retro::sim::{Config, GameEvent, GamePhase, GameState, TickInput, tick};

    let config = Config { seed: 42, ..Config::default() };
    let mut state = GameState::new(config).expect("default configuration must be valid");

    // Start and serve
    let fire = TickInput { fire: true, ..Default::default() };
    tick(&mut state, &fire, SIM_DT);
    tick(&mut state, &fire, SIM_DT);

    // Let the sim run for up to 60 simulated seconds, nudging the paddle
    // under the lowest ball
    let mut destroyed = 0u32;
    for _ in 0..(60 * 120) {
        let target = state
            .balls
            .iter()
            .map(|b| b.pos.x)
            .next()
            .unwrap_or(state.config.screen_width / 2.0);
        let input = TickInput { pointer_x: Some(target), fire: true, ..Default::default() };
        for event in tick(&mut state, &input, SIM_DT) {
            if matches!(event, GameEvent::BrickDestroyed { .. }) {
                destroyed += 1;
            }
        }
        if state.phase == GamePhase::GameOver || state.phase == GamePhase::Victory {
            break;
        }
    }

    println!(
        "Headless demo finished: phase {:?}, score {}, {} bricks destroyed",
        state.phase, state.score, destroyed
    );
}
