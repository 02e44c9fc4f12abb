//! Pointer interaction with the simulated objects.
//!
//! Two strategies share the same pairing data: continuous dragging of a body,
//! and a one-shot impulse on click. One is selected when the scene is built.

pub mod drag;
pub mod impulse;
pub mod picking;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::InteractionSettings;
use crate::rendering::camera::OrthographicCamera;
use crate::world::physics::PhysicsWorld;
use crate::world::registry::{ObjectId, VisualObjectRegistry};
use crate::world::WorldResult;

pub use drag::{DragGrab, DragInteraction, DragState};
pub use impulse::ImpulseInteraction;
pub use picking::{pick, PickHit, Plane, Ray};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionMode {
    Drag,
    Impulse,
}

/// The pieces of the simulation an interaction may read and mutate.
pub struct InteractionScene<'a> {
    pub physics: &'a mut PhysicsWorld,
    pub registry: &'a mut VisualObjectRegistry,
    pub camera: &'a OrthographicCamera,
}

impl InteractionScene<'_> {
    /// Pick the first object under a viewport pixel.
    pub fn pick_at(&self, pointer: Vec2) -> Option<(Ray, PickHit)> {
        let ray = self.camera.ray_from_screen(pointer);
        pick(self.registry, &ray).map(|hit| (ray, hit))
    }
}

/// Reaction to pointer input. Pointers are given in viewport pixels.
pub trait InteractionStrategy {
    fn name(&self) -> &'static str;

    fn pointer_down(&mut self, scene: &mut InteractionScene<'_>, pointer: Vec2) -> WorldResult<()>;

    fn pointer_move(&mut self, scene: &mut InteractionScene<'_>, pointer: Vec2) -> WorldResult<()>;

    fn pointer_up(&mut self, scene: &mut InteractionScene<'_>, pointer: Vec2) -> WorldResult<()>;

    /// Object currently held by the pointer, if any.
    fn selected(&self) -> Option<ObjectId> {
        None
    }
}

pub fn create_strategy(settings: &InteractionSettings) -> Box<dyn InteractionStrategy> {
    match settings.mode {
        InteractionMode::Drag => Box::new(DragInteraction::new()),
        InteractionMode::Impulse => Box::new(ImpulseInteraction::new(Vec3::from_array(settings.impulse))),
    }
}
