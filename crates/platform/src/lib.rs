//! Platform layer: window, event loop, and the per-frame tick.
//!
//! The window and GPU state are created on `resumed`. Each redraw advances
//! the model orientation by the elapsed time, renders, and feeds the frame
//! counter. Escape or a close request ends the loop.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use corelib::{fps::FpsCounter, orientation::Orientation};
use renderer::{GpuState, SceneAssets};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

pub const APP_NAME: &str = "Trisoup";

/// Window and loop settings.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    /// Model spin around Y, radians per second.
    pub spin: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            show_fps: false,
            width: 1280,
            height: 720,
            spin: 0.6,
        }
    }
}

struct App {
    config: RunConfig,
    scene: SceneAssets,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    orientation: Orientation,
    fps: FpsCounter,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: RunConfig, scene: SceneAssets) -> Self {
        Self {
            config,
            scene,
            window: None,
            gpu: None,
            // A slight tilt so the top of the model is visible.
            orientation: Orientation::new(0.0, 0.3),
            fps: FpsCounter::new(),
            last_frame: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(APP_NAME)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.config.backends,
            &self.scene,
        ))
        .context("Failed to initialise GPU state")?;

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.fps = FpsCounter::new();
        self.last_frame = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.orientation.advance(dt, self.config.spin, 0.0);

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        match gpu.render(&self.orientation) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e}; reconfiguring");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("GPU out of memory"));
                return;
            }
            Err(e) => log::warn!("Dropped frame: {e}"),
        }

        if let Some(stats) = self.fps.tick(now) {
            log::debug!("{:.1} FPS, {:.2} ms/frame", stats.fps, stats.frame_time_ms);
            if self.config.show_fps {
                if let Some(window) = &self.window {
                    window.set_title(&stats.title(APP_NAME));
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {:.3}", scale_factor);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open a window and render `scene` until the window is closed.
pub fn run_with_renderer(config: RunConfig, scene: SceneAssets) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, scene);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
