//! Rigid-body simulation backed by rapier3d.
//!
//! Scenes are laid out in screen-sized units (pixels), so the world is created
//! with a matching `length_unit` and gravity in the thousands.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use tracing::{debug, info};

use super::{WorldError, WorldResult};
use crate::config::PhysicsSettings;
use crate::utils::math::{
    from_physics_rotation, from_physics_vector, to_physics_rotation, to_physics_vector, Transform,
};

/// Opaque handle to a body owned by a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Cuboid { half_extents: Vec3 },
    /// Infinite plane through the body origin; everything behind `normal` is solid.
    Plane { normal: Vec3 },
}

/// Everything needed to create a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Zero means static.
    pub mass: f32,
    pub shape: BodyShape,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_damping: f32,
    pub ccd: bool,
}

impl BodyDesc {
    pub fn cuboid(half_extents: Vec3, mass: f32) -> Self {
        Self {
            mass,
            shape: BodyShape::Cuboid { half_extents },
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_damping: 0.0,
            ccd: false,
        }
    }

    pub fn plane(normal: Vec3) -> Self {
        Self {
            mass: 0.0,
            shape: BodyShape::Plane { normal },
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_damping: 0.0,
            ccd: false,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_linear_damping(mut self, linear_damping: f32) -> Self {
        self.linear_damping = linear_damping;
        self
    }

    pub fn with_ccd(mut self, ccd: bool) -> Self {
        self.ccd = ccd;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    fn validate(&self) -> WorldResult<()> {
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(WorldError::InvalidBody {
                reason: format!("mass must be zero or positive, got {}", self.mass),
            });
        }
        match self.shape {
            BodyShape::Cuboid { half_extents } => {
                if half_extents.min_element() <= 0.0 {
                    return Err(WorldError::InvalidBody {
                        reason: format!("cuboid half extents must be positive, got {}", half_extents),
                    });
                }
            }
            BodyShape::Plane { normal } => {
                if !self.is_static() {
                    return Err(WorldError::InvalidBody {
                        reason: "planes can only be static".to_string(),
                    });
                }
                if normal.length_squared() == 0.0 {
                    return Err(WorldError::InvalidBody {
                        reason: "plane normal must be non-zero".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Friction and restitution applied to every collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    contact_material: ContactMaterial,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    ccd_enabled: bool,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = settings.timestep;
        integration_parameters.length_unit = settings.length_unit;

        info!(
            "Creating physics world: gravity {:?}, friction {}, restitution {}, dt {:.4}",
            settings.gravity, settings.friction, settings.restitution, settings.timestep
        );

        Self {
            gravity: to_physics_vector(Vec3::from_array(settings.gravity)),
            contact_material: ContactMaterial {
                friction: settings.friction,
                restitution: settings.restitution,
            },
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            ccd_enabled: settings.ccd_enabled,
            steps: 0,
        }
    }

    pub fn gravity(&self) -> Vec3 {
        from_physics_vector(&self.gravity)
    }

    pub fn contact_material(&self) -> ContactMaterial {
        self.contact_material
    }

    /// Whether fast dynamic bodies should be created with CCD.
    pub fn ccd_enabled(&self) -> bool {
        self.ccd_enabled
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Number of completed simulation steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> WorldResult<BodyHandle> {
        desc.validate()?;

        let builder = if desc.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
                .linear_damping(desc.linear_damping)
                .ccd_enabled(desc.ccd)
        };
        let body = builder
            .translation(to_physics_vector(desc.position))
            .rotation(to_physics_rotation(desc.orientation).scaled_axis())
            .build();

        let collider = match desc.shape {
            BodyShape::Cuboid { half_extents } => {
                let builder = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z);
                if desc.is_static() {
                    builder
                } else {
                    builder.mass(desc.mass)
                }
            }
            BodyShape::Plane { normal } => {
                ColliderBuilder::halfspace(rapier3d::na::Unit::new_normalize(to_physics_vector(normal)))
            }
        }
        .friction(self.contact_material.friction)
        .restitution(self.contact_material.restitution)
        .build();

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        // Mass would otherwise only be known after the next step
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.recompute_mass_properties_from_colliders(&self.collider_set);
        }

        debug!("Added {:?} body (mass {}) at {}", desc.shape, desc.mass, desc.position);
        Ok(BodyHandle(handle))
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> WorldResult<()> {
        self.rigid_body_set
            .remove(
                handle.0,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .map(|_| ())
            .ok_or(WorldError::UnknownBody { handle })
    }

    /// Advance the simulation by `dt` seconds. Non-positive `dt` is a no-op.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.steps += 1;
    }

    fn body(&self, handle: BodyHandle) -> WorldResult<&RigidBody> {
        self.rigid_body_set
            .get(handle.0)
            .ok_or(WorldError::UnknownBody { handle })
    }

    fn body_mut(&mut self, handle: BodyHandle) -> WorldResult<&mut RigidBody> {
        self.rigid_body_set
            .get_mut(handle.0)
            .ok_or(WorldError::UnknownBody { handle })
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.rigid_body_set.contains(handle.0)
    }

    pub fn body_transform(&self, handle: BodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle.0).map(|body| {
            Transform::new(
                from_physics_vector(body.translation()),
                from_physics_rotation(body.rotation()),
            )
        })
    }

    pub fn linear_velocity(&self, handle: BodyHandle) -> WorldResult<Vec3> {
        Ok(from_physics_vector(self.body(handle)?.linvel()))
    }

    pub fn is_static(&self, handle: BodyHandle) -> WorldResult<bool> {
        Ok(self.body(handle)?.is_fixed())
    }

    pub fn is_ccd_enabled(&self, handle: BodyHandle) -> WorldResult<bool> {
        Ok(self.body(handle)?.is_ccd_enabled())
    }

    pub fn is_held(&self, handle: BodyHandle) -> WorldResult<bool> {
        Ok(self.body(handle)?.is_kinematic())
    }

    /// Take a dynamic body out of free simulation: gravity and contacts stop
    /// moving it until [`PhysicsWorld::release`]. Static bodies are left alone.
    pub fn hold(&mut self, handle: BodyHandle) -> WorldResult<()> {
        let body = self.body_mut(handle)?;
        if !body.is_dynamic() {
            return Ok(());
        }
        body.set_linvel(Vector::zeros(), true);
        body.set_angvel(Vector::zeros(), true);
        body.set_body_type(RigidBodyType::KinematicPositionBased, true);
        debug!("Holding body {:?}", handle);
        Ok(())
    }

    /// Hand a held body back to the simulation, at rest at its current position.
    pub fn release(&mut self, handle: BodyHandle) -> WorldResult<()> {
        let body = self.body_mut(handle)?;
        if !body.is_kinematic() {
            return Ok(());
        }
        body.set_body_type(RigidBodyType::Dynamic, true);
        body.set_linvel(Vector::zeros(), true);
        body.set_angvel(Vector::zeros(), true);
        debug!("Released body {:?}", handle);
        Ok(())
    }

    /// Overwrite a body's position, keeping its orientation.
    pub fn force_position(&mut self, handle: BodyHandle, position: Vec3) -> WorldResult<()> {
        let body = self.body_mut(handle)?;
        if body.is_fixed() {
            return Err(WorldError::StaticBody { handle });
        }
        let translation = to_physics_vector(position);
        body.set_translation(translation, true);
        if body.is_kinematic() {
            body.set_next_kinematic_translation(translation);
        }
        Ok(())
    }

    /// Apply an instantaneous impulse at a world-space point. Returns `false`
    /// when the body does not respond to forces (static or held).
    pub fn apply_impulse_at(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) -> WorldResult<bool> {
        let body = self.body_mut(handle)?;
        if !body.is_dynamic() {
            return Ok(false);
        }
        body.apply_impulse_at_point(
            to_physics_vector(impulse),
            point![point.x, point.y, point.z],
            true,
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsSettings::default())
    }

    #[test]
    fn test_rejects_invalid_bodies() {
        let mut world = world();
        assert!(world.add_body(BodyDesc::cuboid(Vec3::splat(10.0), -1.0)).is_err());
        assert!(world.add_body(BodyDesc::cuboid(Vec3::new(10.0, 0.0, 10.0), 1.0)).is_err());
        assert!(world.add_body(BodyDesc::plane(Vec3::ZERO)).is_err());

        let mut moving_plane = BodyDesc::plane(Vec3::Y);
        moving_plane.mass = 2.0;
        assert!(world.add_body(moving_plane).is_err());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_zero_dt_does_not_step() {
        let mut world = world();
        let handle = world
            .add_body(BodyDesc::cuboid(Vec3::splat(10.0), 1.0).with_position(Vec3::new(0.0, 100.0, 0.0)))
            .unwrap();
        world.step(0.0);
        assert_eq!(world.steps(), 0);
        assert_eq!(world.body_transform(handle).unwrap().position, Vec3::new(0.0, 100.0, 0.0));
    }

    #[test]
    fn test_held_body_ignores_gravity() {
        let mut world = world();
        let handle = world
            .add_body(BodyDesc::cuboid(Vec3::splat(10.0), 1.0).with_position(Vec3::new(0.0, 100.0, 0.0)))
            .unwrap();
        world.hold(handle).unwrap();
        assert!(world.is_held(handle).unwrap());
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.body_transform(handle).unwrap().position, Vec3::new(0.0, 100.0, 0.0));

        world.release(handle).unwrap();
        assert!(!world.is_held(handle).unwrap());
        world.step(1.0 / 60.0);
        assert!(world.body_transform(handle).unwrap().position.y < 100.0);
    }

    #[test]
    fn test_force_position_on_static_body_fails() {
        let mut world = world();
        let ground = world.add_body(BodyDesc::plane(Vec3::Y)).unwrap();
        assert!(matches!(
            world.force_position(ground, Vec3::ONE),
            Err(WorldError::StaticBody { .. })
        ));
        assert!(!world.apply_impulse_at(ground, Vec3::Y, Vec3::ZERO).unwrap());
    }

    #[test]
    fn test_remove_body() {
        let mut world = world();
        let handle = world.add_body(BodyDesc::cuboid(Vec3::splat(1.0), 1.0)).unwrap();
        world.remove_body(handle).unwrap();
        assert!(!world.contains(handle));
        assert!(world.body_transform(handle).is_none());
        assert!(matches!(world.remove_body(handle), Err(WorldError::UnknownBody { .. })));
    }
}
