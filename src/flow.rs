//! Application event loop.
//!
//! [`run`] opens the window and drives the scene until the window is closed.
//! Every redraw advances the animation, syncs the GPU mirror, renders and asks
//! for the next redraw, so the loop runs for as long as the window exists.
//!
//! Asset loads run in the background and report back through the event loop
//! proxy as [`FlowEvent::Asset`]; they are applied on the loop thread between
//! frames, so the scene is only ever mutated from one place.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the GPU context, builds the [`Stage`]
//!    and starts the asset loads
//! 2. mouse, wheel and touch events feed the camera controls and the debug panel
//! 3. `RedrawRequested` animates, uploads and presents one frame

use std::{fmt::Debug, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::Context,
    render::SceneRenderer,
    resources::{AssetEvent, spawn_asset_loads},
    stage::Stage,
};

/// Pixels per wheel step for touchpads that report pixel deltas.
const PIXELS_PER_LINE: f64 = 40.0;

const FRAME_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Everything that exists once the window and GPU are up.
pub struct AppState {
    pub ctx: Context,
    pub stage: Stage,
    renderer: SceneRenderer,
    cursor: (f64, f64),
    frames: u32,
    last_report: Instant,
}

impl AppState {
    pub async fn new(window: Arc<Window>, config: SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.clear_colour).await?;
        let (width, height) = ctx.size();
        let mut stage = Stage::from_config(config, width, height);
        stage.set_pixel_ratio(ctx.window().scale_factor());
        Ok(Self {
            ctx,
            stage,
            renderer: SceneRenderer::new(),
            cursor: (0.0, 0.0),
            frames: 0,
            last_report: Instant::now(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        self.stage.resize(width, height);
    }

    /// Advances the animation one step and draws the result.
    fn frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.stage.animate();

        self.renderer
            .sync(&mut self.ctx, self.stage.scene(), self.stage.textures());
        self.ctx
            .camera
            .update(&self.ctx.queue, self.stage.camera(), self.stage.projection());
        let (vertices, indices) = self.stage.overlay();
        self.renderer
            .set_overlay(&self.ctx.device, vertices, &indices);
        #[cfg(feature = "ui")]
        self.renderer.set_captions(&self.ctx, &self.stage.captions());

        self.renderer.render(&self.ctx)?;
        self.renderer.end_frame();
        self.count_frame();
        Ok(())
    }

    fn count_frame(&mut self) {
        self.frames += 1;
        let elapsed = self.last_report.elapsed();
        if elapsed >= FRAME_REPORT_INTERVAL {
            log::debug!(
                "{} frames in {:.1}s, {} objects",
                self.frames,
                elapsed.as_secs_f32(),
                self.renderer.object_count()
            );
            self.frames = 0;
            self.last_report = Instant::now();
        }
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                self.stage.pointer_moved(self.cursor);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.stage.pointer_pressed(self.cursor),
                ElementState::Released => self.stage.pointer_released(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                        (y / PIXELS_PER_LINE) as f32
                    }
                };
                self.stage.wheel(lines);
            }
            WindowEvent::Touch(Touch {
                id, phase, location, ..
            }) => {
                let position = (location.x, location.y);
                match phase {
                    TouchPhase::Started => self.stage.touch_started(*id, position),
                    TouchPhase::Moved => self.stage.touch_moved(*id, position),
                    TouchPhase::Ended | TouchPhase::Cancelled => self.stage.touch_ended(*id),
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.stage.set_pixel_ratio(*scale_factor);
            }
            _ => {}
        }
    }
}

pub enum FlowEvent {
    /// GPU setup finished on the web, where it cannot block.
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<AppState>),
    Asset(AssetEvent),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Asset(event) => f.debug_tuple("Asset").field(event).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: Option<SceneConfig>,
    state: Option<AppState>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config: Some(config),
            state: None,
        })
    }

    /// Starts the background loads for everything the stage is waiting on.
    fn start_loads(&self, stage: &Stage) {
        let proxy = self.proxy.clone();
        let sink = move |event: AssetEvent| {
            if proxy.send_event(FlowEvent::Asset(event)).is_err() {
                log::warn!("event loop closed before an asset arrived");
            }
        };
        #[cfg(not(target_arch = "wasm32"))]
        let spawner = self.async_runtime.handle().clone();
        #[cfg(target_arch = "wasm32")]
        let spawner = ();
        spawn_asset_loads(&spawner, stage.config(), stage.textures(), sink);
    }

    fn attach(&mut self, mut state: AppState) {
        let size = state.ctx.window().inner_size();
        state.resize(size.width, size.height);
        self.start_loads(&state.stage);
        state.ctx.window().request_redraw();
        self.state = Some(state);
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(config) = self.config.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Moon");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => {
                    log::info!("no #{CANVAS_ID} element, appending a canvas to the page");
                    window_attributes = window_attributes.with_append(true);
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(AppState::new(window, config)) {
                Ok(state) => self.attach(state),
                Err(e) => {
                    log::error!("could not initialise graphics: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match AppState::new(window, config).await {
                    Ok(state) => {
                        if proxy
                            .send_event(FlowEvent::Initialized(Box::new(state)))
                            .is_err()
                        {
                            log::error!("event loop closed during initialisation");
                        }
                    }
                    Err(e) => log::error!("could not initialise graphics: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            FlowEvent::Initialized(state) => self.attach(*state),
            FlowEvent::Asset(asset) => match &mut self.state {
                Some(state) => {
                    log::debug!("{asset:?}");
                    state.stage.handle_asset(asset);
                }
                None => log::warn!("asset arrived before the scene existed: {asset:?}"),
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                match state.frame() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window().inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {e}");
                    }
                }
                state.ctx.window().request_redraw();
            }
            _ => {}
        }
    }
}

/// Opens the window and runs the scene until the window is closed.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {e}");
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::warn!("a logger was already installed");
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
