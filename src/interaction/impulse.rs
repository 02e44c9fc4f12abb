use glam::{Vec2, Vec3};
use tracing::{debug, info};

use super::{InteractionScene, InteractionStrategy};
use crate::world::WorldResult;

/// Kicks the first body under the pointer once per press.
#[derive(Debug)]
pub struct ImpulseInteraction {
    impulse: Vec3,
    applied: u64,
}

impl ImpulseInteraction {
    pub fn new(impulse: Vec3) -> Self {
        Self { impulse, applied: 0 }
    }

    pub fn impulse(&self) -> Vec3 {
        self.impulse
    }

    /// Number of impulses that reached a body.
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl InteractionStrategy for ImpulseInteraction {
    fn name(&self) -> &'static str {
        "impulse"
    }

    fn pointer_down(&mut self, scene: &mut InteractionScene<'_>, pointer: Vec2) -> WorldResult<()> {
        let Some((_, hit)) = scene.pick_at(pointer) else {
            return Ok(());
        };
        let Some(body) = scene.registry.body_of(hit.object) else {
            debug!("Picked {} has no body, nothing to push", hit.object);
            return Ok(());
        };

        if scene.physics.apply_impulse_at(body, self.impulse, hit.point)? {
            self.applied += 1;
            info!("Applied impulse {} to {} at {}", self.impulse, hit.object, hit.point);
        }
        Ok(())
    }

    fn pointer_move(&mut self, _scene: &mut InteractionScene<'_>, _pointer: Vec2) -> WorldResult<()> {
        Ok(())
    }

    fn pointer_up(&mut self, _scene: &mut InteractionScene<'_>, _pointer: Vec2) -> WorldResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsSettings;
    use crate::rendering::camera::OrthographicCamera;
    use crate::utils::math::Transform;
    use crate::world::physics::{BodyDesc, PhysicsWorld};
    use crate::world::registry::{VisualDesc, VisualObjectRegistry};

    #[test]
    fn test_impulse_hits_only_picked_body() {
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let mut registry = VisualObjectRegistry::new();
        let camera = OrthographicCamera::new(800, 600);

        let mut bodies = Vec::new();
        for x in [0.0, 200.0] {
            let position = Vec3::new(x, 0.0, 0.0);
            let body = physics
                .add_body(BodyDesc::cuboid(Vec3::splat(50.0), 5.0).with_position(position))
                .unwrap();
            registry
                .insert_paired(VisualDesc::cube(Transform::from_position(position), 100.0), body)
                .unwrap();
            bodies.push(body);
        }

        let mut impulse = ImpulseInteraction::new(Vec3::new(0.0, 1000.0, 0.0));
        let mut scene = InteractionScene {
            physics: &mut physics,
            registry: &mut registry,
            camera: &camera,
        };

        // Miss
        impulse.pointer_down(&mut scene, Vec2::new(100.0, 50.0)).unwrap();
        assert_eq!(impulse.applied(), 0);

        // Centre of the first cube
        impulse.pointer_down(&mut scene, Vec2::new(400.0, 300.0)).unwrap();
        assert_eq!(impulse.applied(), 1);
        assert!(impulse.selected().is_none());

        assert!(physics.linear_velocity(bodies[0]).unwrap().y > 0.0);
        assert_eq!(physics.linear_velocity(bodies[1]).unwrap(), Vec3::ZERO);
    }
}
