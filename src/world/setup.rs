//! Scene population: the ground, the falling cubes and loaded models.

use glam::{Vec2, Vec3};
use rand::Rng;
use tracing::{debug, info};

use super::physics::{BodyDesc, BodyHandle, PhysicsWorld};
use super::registry::{ModelId, ObjectId, VisualDesc, VisualObjectRegistry};
use super::WorldResult;
use crate::assets::ModelData;
use crate::config::SceneLayout;
use crate::utils::math::Transform;

/// Thinnest collision box a flat model is given.
const MIN_HALF_EXTENT: f32 = 0.5;

/// Where and how heavy a model becomes once its geometry has loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    pub position: Vec3,
    pub mass: f32,
    pub scale: f32,
}

impl ModelPlacement {
    pub fn from_layout(layout: &SceneLayout, position: Vec3) -> Self {
        Self {
            position,
            mass: layout.model_mass,
            scale: layout.model_scale,
        }
    }
}

/// Static floor along the bottom edge of the viewport.
pub fn spawn_ground(physics: &mut PhysicsWorld, viewport: Vec2) -> WorldResult<BodyHandle> {
    let position = Vec3::new(0.0, -viewport.y * 0.5, 0.0);
    let ground = physics.add_body(BodyDesc::plane(Vec3::Y).with_position(position))?;
    debug!("Ground plane at y = {}", position.y);
    Ok(ground)
}

pub fn spawn_cube(
    physics: &mut PhysicsWorld,
    registry: &mut VisualObjectRegistry,
    layout: &SceneLayout,
    position: Vec3,
) -> WorldResult<ObjectId> {
    let half = layout.cube_size * 0.5;
    let body = physics.add_body(
        BodyDesc::cuboid(Vec3::splat(half), layout.cube_mass)
            .with_position(position)
            .with_linear_damping(layout.cube_linear_damping)
            .with_ccd(physics.ccd_enabled()),
    )?;
    registry.insert_paired(VisualDesc::cube(Transform::from_position(position), layout.cube_size), body)
}

/// Scatter `layout.cube_count` cubes across the viewport width, in the band
/// from the top edge up to half a viewport above it.
pub fn populate_cubes<R: Rng>(
    physics: &mut PhysicsWorld,
    registry: &mut VisualObjectRegistry,
    layout: &SceneLayout,
    viewport: Vec2,
    rng: &mut R,
) -> WorldResult<Vec<ObjectId>> {
    let mut cubes = Vec::with_capacity(layout.cube_count);
    for _ in 0..layout.cube_count {
        let position = Vec3::new(
            (rng.random::<f32>() - 0.5) * viewport.x,
            rng.random::<f32>() * viewport.y * 0.5 + viewport.y * 0.5,
            0.0,
        );
        cubes.push(spawn_cube(physics, registry, layout, position)?);
    }
    info!("Spawned {} cubes", cubes.len());
    Ok(cubes)
}

/// Pair a loaded model with a box body enclosing its scaled bounds.
pub fn spawn_model(
    physics: &mut PhysicsWorld,
    registry: &mut VisualObjectRegistry,
    model: ModelId,
    data: &ModelData,
    placement: &ModelPlacement,
) -> WorldResult<ObjectId> {
    let half_extents = (data.half_extents() * placement.scale).max(Vec3::splat(MIN_HALF_EXTENT));
    let body = physics.add_body(
        BodyDesc::cuboid(half_extents, placement.mass)
            .with_position(placement.position)
            .with_ccd(physics.ccd_enabled()),
    )?;
    let id = registry.insert_paired(
        VisualDesc::model(model, Transform::from_position(placement.position), placement.scale, half_extents),
        body,
    )?;
    info!("Model {:?} spawned as {} at {}", model, id, placement.position);
    Ok(id)
}
