//! Continuous drag of a picked object.
//!
//! The grab fixes a drag plane through the object's centre facing the camera,
//! and remembers where on that plane the object was grabbed. Every move puts
//! the object back under the pointer with the same offset; its body follows in
//! the z = 0 plane and is kept out of the simulation until release.

use glam::{Vec2, Vec3};
use tracing::{debug, info};

use super::picking::Plane;
use super::{InteractionScene, InteractionStrategy};
use crate::world::registry::ObjectId;
use crate::world::WorldResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGrab {
    pub object: ObjectId,
    pub plane: Plane,
    /// Grab point minus object centre at grab time.
    pub offset: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging(DragGrab),
}

impl Default for DragState {
    fn default() -> Self {
        DragState::Idle
    }
}

impl std::fmt::Display for DragState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DragState::Idle => write!(f, "Idle"),
            DragState::Dragging(grab) => write!(f, "Dragging({})", grab.object),
        }
    }
}

#[derive(Debug, Default)]
pub struct DragInteraction {
    state: DragState,
}

/// Bodies follow the pointer in this plane.
fn pinned(position: Vec3) -> Vec3 {
    Vec3::new(position.x, position.y, 0.0)
}

impl DragInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }
}

impl InteractionStrategy for DragInteraction {
    fn name(&self) -> &'static str {
        "drag"
    }

    fn pointer_down(&mut self, scene: &mut InteractionScene<'_>, pointer: Vec2) -> WorldResult<()> {
        if self.is_dragging() {
            return Ok(());
        }
        let Some((ray, hit)) = scene.pick_at(pointer) else {
            return Ok(());
        };
        let Some(pairing) = scene.registry.get(hit.object) else {
            return Ok(());
        };

        let centre = pairing.visual.transform.position;
        let plane = Plane::from_normal_and_point(scene.camera.forward(), centre);
        let grab_point = ray
            .intersect_plane(&plane)
            .map(|t| ray.at(t))
            .unwrap_or(hit.point);

        if let Some(body) = pairing.body {
            if !scene.physics.is_static(body)? {
                scene.physics.hold(body)?;
                scene.physics.force_position(body, pinned(centre))?;
            }
        }

        self.state = DragState::Dragging(DragGrab {
            object: hit.object,
            plane,
            offset: grab_point - centre,
        });
        info!("Drag started on {} at {}", hit.object, centre);
        Ok(())
    }

    fn pointer_move(&mut self, scene: &mut InteractionScene<'_>, pointer: Vec2) -> WorldResult<()> {
        let DragState::Dragging(grab) = self.state else {
            return Ok(());
        };
        let Some(pairing) = scene.registry.get_mut(grab.object) else {
            // The object went away under the pointer
            self.state = DragState::Idle;
            return Ok(());
        };

        let ray = scene.camera.ray_from_screen(pointer);
        let Some(t) = ray.intersect_plane(&grab.plane) else {
            return Ok(());
        };
        let target = ray.at(t) - grab.offset;
        pairing.visual.transform.position = target;

        if let Some(body) = pairing.body {
            if !scene.physics.is_static(body)? {
                scene.physics.force_position(body, pinned(target))?;
            }
        }
        debug!("Dragging {} to {}", grab.object, target);
        Ok(())
    }

    fn pointer_up(&mut self, scene: &mut InteractionScene<'_>, _pointer: Vec2) -> WorldResult<()> {
        let DragState::Dragging(grab) = self.state else {
            return Ok(());
        };
        self.state = DragState::Idle;

        if let Some(body) = scene.registry.body_of(grab.object) {
            if scene.physics.contains(body) {
                scene.physics.release(body)?;
            }
        }
        info!("Drag ended on {}", grab.object);
        Ok(())
    }

    fn selected(&self) -> Option<ObjectId> {
        match self.state {
            DragState::Dragging(grab) => Some(grab.object),
            DragState::Idle => None,
        }
    }
}
