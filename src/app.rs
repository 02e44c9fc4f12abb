use std::sync::Arc;

use glam::Vec2;
use image::DynamicImage;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::assets::{ColladaModelLoader, ModelRequests, TextureSource};
use crate::config::SceneSettings;
use crate::rendering::engine::RenderEngine;
use crate::world::sync::{SimulationContext, TickOutcome};

/// Window, renderer and simulation, created once the event loop resumes.
struct Running {
    window: Arc<Window>,
    renderer: RenderEngine,
    simulation: SimulationContext,
    texture: Option<oneshot::Receiver<DynamicImage>>,
}

pub struct CubefallApp {
    settings: SceneSettings,
    runtime: Handle,
    running: Option<Running>,
    cursor: Vec2,
    failure: Option<anyhow::Error>,
}

impl CubefallApp {
    pub fn new(settings: SceneSettings, runtime: Handle) -> Self {
        Self {
            settings,
            runtime,
            running: None,
            cursor: Vec2::ZERO,
            failure: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Running> {
        let attributes = Window::default_attributes()
            .with_title(format!("{} {}", crate::APP_NAME, crate::VERSION))
            .with_inner_size(LogicalSize::new(
                self.settings.rendering.window_width,
                self.settings.rendering.window_height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let renderer = pollster::block_on(RenderEngine::new(Arc::clone(&window), &self.settings))?;

        let size = window.inner_size();
        let mut simulation = SimulationContext::new(&self.settings, size.width, size.height)?;
        simulation.attach_model_requests(ModelRequests::new(
            self.runtime.clone(),
            Arc::new(ColladaModelLoader::new()),
        ));
        if let Some(path) = &self.settings.assets.model_path {
            simulation.request_model(path.clone());
        }

        let texture = self.settings.assets.cube_texture.as_deref().map(|source| {
            let source = TextureSource::parse(source);
            let (tx, rx) = oneshot::channel();
            self.runtime.spawn(async move {
                if let Some(img) = source.fetch_or_log().await {
                    let _ = tx.send(img);
                }
            });
            rx
        });

        Ok(Running {
            window,
            renderer,
            simulation,
            texture,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{:#}", e);
        self.failure = Some(e);
        event_loop.exit();
    }

    /// Error that ended the event loop, if any.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }
}

impl Running {
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(rx) = self.texture.as_mut() {
            match rx.try_recv() {
                Ok(img) => {
                    self.renderer.set_cube_texture(&img);
                    self.texture = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.texture = None,
            }
        }

        if self.simulation.tick() == TickOutcome::Stopped {
            return;
        }
        for (model, data) in self.simulation.take_new_models() {
            self.renderer.upload_model(model, &data);
        }

        match self.renderer.render(self.simulation.registry(), self.simulation.camera()) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.renderer.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Surface out of memory, exiting");
                self.simulation.stop();
                event_loop.exit();
                return;
            }
            Err(e) => warn!("Surface error: {:?}, skipping frame", e),
        }
        self.window.request_redraw();
    }
}

impl ApplicationHandler for CubefallApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if running.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                running.simulation.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.renderer.resize(size);
                running.simulation.resize_viewport(size.width, size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                running.simulation.pointer_move(self.cursor);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => running.simulation.pointer_down(self.cursor),
                ElementState::Released => running.simulation.pointer_up(self.cursor),
            },
            WindowEvent::RedrawRequested => running.redraw(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.as_mut() {
            running.simulation.stop();
        }
    }
}

/// Open the window and run until it closes.
pub fn run(settings: SceneSettings, runtime: Handle) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = CubefallApp::new(settings, runtime);
    event_loop.run_app(&mut app)?;
    match app.take_failure() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
