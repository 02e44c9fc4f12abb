//! The frame loop: one physics step per tick, then every visual is brought in
//! line with its body.

use std::path::PathBuf;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use super::physics::{BodyHandle, PhysicsWorld};
use super::registry::{ModelId, VisualObjectRegistry};
use super::setup::{self, ModelPlacement};
use super::WorldResult;
use crate::assets::{ModelData, ModelRequests};
use crate::config::SceneSettings;
use crate::interaction::{create_strategy, InteractionScene, InteractionStrategy};
use crate::rendering::camera::OrthographicCamera;

/// What a call to [`SimulationContext::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    Stopped,
}

/// Whether the loop still accepts ticks and pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
enum PointerEvent {
    Down,
    Move,
    Up,
}

/// Owns everything the simulation touches between frames.
pub struct SimulationContext {
    settings: SceneSettings,
    physics: PhysicsWorld,
    registry: VisualObjectRegistry,
    interaction: Box<dyn InteractionStrategy>,
    camera: OrthographicCamera,
    ground: BodyHandle,
    timestep: f32,
    state: LoopState,
    ticks: u64,
    model_requests: Option<ModelRequests<ModelPlacement>>,
    next_model: u32,
    new_models: Vec<(ModelId, ModelData)>,
}

impl SimulationContext {
    /// Build the scene for a viewport of `width` x `height` pixels.
    pub fn new(settings: &SceneSettings, width: u32, height: u32) -> WorldResult<Self> {
        let camera = OrthographicCamera::new(width, height);
        let viewport = camera.viewport();

        let mut physics = PhysicsWorld::new(&settings.physics);
        let mut registry = VisualObjectRegistry::new();
        let ground = setup::spawn_ground(&mut physics, viewport)?;

        let mut rng = match settings.scene.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        setup::populate_cubes(&mut physics, &mut registry, &settings.scene, viewport, &mut rng)?;

        let interaction = create_strategy(&settings.interaction);
        info!(
            "Simulation ready: {:?} preset, {} objects, {} interaction",
            settings.preset,
            registry.len(),
            interaction.name()
        );

        Ok(Self {
            settings: settings.clone(),
            physics,
            registry,
            interaction,
            camera,
            ground,
            timestep: settings.physics.timestep,
            state: LoopState::Running,
            ticks: 0,
            model_requests: None,
            next_model: 0,
            new_models: Vec::new(),
        })
    }

    /// Route model loads through `requests`; results are applied by [`tick`](Self::tick).
    pub fn attach_model_requests(&mut self, requests: ModelRequests<ModelPlacement>) {
        self.model_requests = Some(requests);
    }

    /// Start loading a model. It joins the scene on the first tick after it
    /// loads; a failed load leaves the scene untouched.
    pub fn request_model(&mut self, path: impl Into<PathBuf>) -> bool {
        let placement = ModelPlacement::from_layout(
            &self.settings.scene,
            Vec3::new(0.0, self.camera.viewport().y * 0.25, 0.0),
        );
        match self.model_requests.as_mut() {
            Some(requests) => {
                requests.request(path, placement);
                true
            }
            None => {
                warn!("No model loader attached, ignoring model request");
                false
            }
        }
    }

    /// Models still loading.
    pub fn pending_models(&self) -> usize {
        self.model_requests.as_ref().map_or(0, |r| r.pending())
    }

    /// Geometry of models spawned since the last call, for upload.
    pub fn take_new_models(&mut self) -> Vec<(ModelId, ModelData)> {
        std::mem::take(&mut self.new_models)
    }

    /// One animation frame: apply finished loads, step by the fixed timestep,
    /// sync visuals.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state == LoopState::Stopped {
            return TickOutcome::Stopped;
        }
        self.apply_loaded_models();
        self.advance(self.timestep);
        self.ticks += 1;
        TickOutcome::Advanced
    }

    /// Step by an arbitrary `dt`. A zero `dt` changes nothing.
    pub fn advance(&mut self, dt: f32) {
        if self.state == LoopState::Stopped || dt <= 0.0 {
            return;
        }
        self.physics.step(dt);
        self.sync_visuals();
    }

    /// Copy body transforms onto visuals. The dragged object only gets its
    /// position; objects without a body are skipped.
    pub fn sync_visuals(&mut self) {
        let selected = self.interaction.selected();
        for pairing in self.registry.iter_mut() {
            let Some(body) = pairing.body else {
                continue;
            };
            let Some(transform) = self.physics.body_transform(body) else {
                continue;
            };
            if selected == Some(pairing.visual.id) {
                pairing.visual.transform.position = transform.position;
            } else {
                pairing.visual.transform = transform;
            }
        }
    }

    fn apply_loaded_models(&mut self) {
        let finished = match self.model_requests.as_mut() {
            Some(requests) => requests.poll(),
            None => return,
        };

        for loaded in finished {
            let data = match loaded.result {
                Ok(data) => data,
                Err(e) => {
                    error!("Model {:?} failed to load: {:#}", loaded.path, e);
                    continue;
                }
            };
            let model = ModelId(self.next_model);
            match setup::spawn_model(&mut self.physics, &mut self.registry, model, &data, &loaded.tag) {
                Ok(_) => {
                    self.next_model += 1;
                    self.new_models.push((model, data));
                }
                Err(e) => error!("Could not add model {:?} to the scene: {}", loaded.path, e),
            }
        }
    }

    pub fn pointer_down(&mut self, pointer: Vec2) {
        self.dispatch(PointerEvent::Down, pointer);
    }

    pub fn pointer_move(&mut self, pointer: Vec2) {
        self.dispatch(PointerEvent::Move, pointer);
    }

    pub fn pointer_up(&mut self, pointer: Vec2) {
        self.dispatch(PointerEvent::Up, pointer);
    }

    fn dispatch(&mut self, event: PointerEvent, pointer: Vec2) {
        if self.state == LoopState::Stopped {
            return;
        }
        let mut scene = InteractionScene {
            physics: &mut self.physics,
            registry: &mut self.registry,
            camera: &self.camera,
        };
        let result = match event {
            PointerEvent::Down => self.interaction.pointer_down(&mut scene, pointer),
            PointerEvent::Move => self.interaction.pointer_move(&mut scene, pointer),
            PointerEvent::Up => self.interaction.pointer_up(&mut scene, pointer),
        };
        if let Err(e) = result {
            warn!("Pointer {:?} at {} failed: {}", event, pointer, e);
        }
    }

    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    /// End the loop. Any held body is let go first.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.dispatch(PointerEvent::Up, Vec2::ZERO);
        self.state = LoopState::Stopped;
        info!("Simulation stopped after {} ticks", self.ticks);
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn registry(&self) -> &VisualObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VisualObjectRegistry {
        &mut self.registry
    }

    /// Both halves at once, for building a scene by hand.
    pub fn world_mut(&mut self) -> (&mut PhysicsWorld, &mut VisualObjectRegistry) {
        (&mut self.physics, &mut self.registry)
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn interaction(&self) -> &dyn InteractionStrategy {
        self.interaction.as_ref()
    }

    pub fn ground(&self) -> BodyHandle {
        self.ground
    }
}

impl Drop for SimulationContext {
    fn drop(&mut self) {
        debug!("Disposing simulation ({} objects)", self.registry.len());
    }
}
