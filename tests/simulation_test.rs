use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use glam::{Quat, Vec2, Vec3};
use tokio::runtime::Handle;

use cubefall::assets::{AssetLoader, ColladaModelLoader, ModelData, ModelRequests};
use cubefall::config::{ScenePreset, SceneSettings};
use cubefall::utils::math::Transform;
use cubefall::world::registry::{ObjectId, VisualDesc};
use cubefall::world::setup;
use cubefall::world::sync::{SimulationContext, TickOutcome};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
// Ground sits on the bottom edge, cubes are 150 across
const GROUND_Y: f32 = -300.0;
const CUBE_HALF: f32 = 75.0;

fn context(preset: ScenePreset, cubes: usize) -> SimulationContext {
    let mut settings = SceneSettings::for_preset(preset);
    settings.scene.cube_count = cubes;
    settings.scene.seed = Some(2024);
    settings.assets.model_path = None;
    SimulationContext::new(&settings, WIDTH, HEIGHT).unwrap()
}

fn spawn_cube(context: &mut SimulationContext, position: Vec3) -> ObjectId {
    let layout = context.settings().scene.clone();
    let (physics, registry) = context.world_mut();
    setup::spawn_cube(physics, registry, &layout, position).unwrap()
}

fn body_position(context: &SimulationContext, id: ObjectId) -> Vec3 {
    let body = context.registry().body_of(id).unwrap();
    context.physics().body_transform(body).unwrap().position
}

fn visual_transforms(context: &SimulationContext) -> Vec<(ObjectId, Transform)> {
    let mut transforms: Vec<_> = context.registry().visuals().map(|v| (v.id, v.transform)).collect();
    transforms.sort_by_key(|(id, _)| *id);
    transforms
}

/// Viewport pixel over a world point in the 800x600 scene.
fn pixel_of(world: Vec3) -> Vec2 {
    Vec2::new(world.x + WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0 - world.y)
}

#[test]
fn test_visuals_mirror_bodies_after_ticks() {
    let mut context = context(ScenePreset::DragCubes, 20);
    for _ in 0..30 {
        assert_eq!(context.tick(), TickOutcome::Advanced);
    }

    for pairing in context.registry().iter() {
        let body = pairing.body.unwrap();
        let transform = context.physics().body_transform(body).unwrap();
        assert_eq!(pairing.visual.transform, transform);
    }
}

#[test]
fn test_zero_dt_changes_nothing() {
    let mut context = context(ScenePreset::DragCubes, 10);
    for _ in 0..5 {
        context.tick();
    }
    let before = visual_transforms(&context);
    let steps = context.physics().steps();

    context.advance(0.0);

    assert_eq!(visual_transforms(&context), before);
    assert_eq!(context.physics().steps(), steps);
}

#[test]
fn test_unpaired_visual_is_left_alone() {
    let mut context = context(ScenePreset::DragCubes, 8);
    let placed = Transform::new(Vec3::new(12.5, -40.0, 0.0), Quat::from_rotation_z(0.3));
    let lone = context.registry_mut().insert_unpaired(VisualDesc::cube(placed, 150.0));

    for _ in 0..45 {
        context.tick();
    }

    assert_eq!(context.registry().visual(lone).unwrap().transform, placed);
    assert_eq!(context.registry().body_of(lone), None);
    for pairing in context.registry().iter().filter(|p| p.visual.id != lone) {
        let body = pairing.body.unwrap();
        assert_eq!(pairing.visual.transform, context.physics().body_transform(body).unwrap());
    }
}

#[test]
fn test_visual_keeps_last_transform_after_body_removal() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::new(0.0, 200.0, 0.0));
    let other = spawn_cube(&mut context, Vec3::new(250.0, 200.0, 0.0));
    for _ in 0..10 {
        context.tick();
    }

    let body = context.registry().body_of(cube).unwrap();
    context.physics_mut().remove_body(body).unwrap();
    let last = context.registry().visual(cube).unwrap().transform;
    let other_before = context.registry().visual(other).unwrap().transform;

    for _ in 0..10 {
        assert_eq!(context.tick(), TickOutcome::Advanced);
    }

    assert_eq!(context.registry().visual(cube).unwrap().transform, last);
    let other_after = context.registry().visual(other).unwrap().transform;
    assert!(other_after.position.y < other_before.position.y);
}

#[test]
fn test_cube_drop_settles_on_ground() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::new(0.0, 1000.0, 0.0));
    let rest_y = GROUND_Y + CUBE_HALF;

    let mut previous = body_position(&context, cube).y;
    for _ in 0..600 {
        context.tick();
        let y = body_position(&context, cube).y;

        // Free fall until the cube nears the ground
        if previous > rest_y + 20.0 {
            assert!(y < previous, "cube rose during free fall: {} -> {}", previous, y);
        }
        assert!(y - CUBE_HALF >= GROUND_Y - 10.0, "cube passed through the ground: {}", y);
        previous = y;
    }

    let settled = body_position(&context, cube);
    assert!((settled.y - rest_y).abs() <= 5.0, "cube settled at {}", settled.y);
    assert_eq!(context.registry().visual(cube).unwrap().transform.position, settled);
}

#[test]
fn test_static_ground_never_moves() {
    let mut context = context(ScenePreset::DragCubes, 15);
    let ground = context.ground();
    let before = context.physics().body_transform(ground).unwrap();

    for _ in 0..120 {
        context.tick();
    }

    assert_eq!(context.physics().body_transform(ground).unwrap(), before);
}

#[test]
fn test_dragged_body_tracks_pointer_in_z_zero() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::ZERO);

    context.pointer_down(pixel_of(Vec3::ZERO));
    assert_eq!(context.interaction().selected(), Some(cube));

    for target in [Vec3::new(50.0, 20.0, 0.0), Vec3::new(-120.0, 140.0, 0.0), Vec3::new(200.0, -60.0, 0.0)] {
        context.pointer_move(pixel_of(target));
        context.tick();

        let position = body_position(&context, cube);
        assert_eq!(position.z, 0.0);
        assert!((position.truncate() - target.truncate()).length() < 1e-3, "{} vs {}", position, target);
        assert_eq!(context.registry().visual(cube).unwrap().transform.position, position);
    }
}

#[test]
fn test_released_body_falls_from_last_position() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::ZERO);
    let body = context.registry().body_of(cube).unwrap();

    context.pointer_down(pixel_of(Vec3::ZERO));
    context.pointer_move(pixel_of(Vec3::new(0.0, 150.0, 0.0)));
    context.tick();
    context.pointer_up(pixel_of(Vec3::new(0.0, 150.0, 0.0)));
    assert_eq!(context.interaction().selected(), None);
    assert!(!context.physics().is_held(body).unwrap());

    let released_at = body_position(&context, cube);
    context.tick();
    let after = body_position(&context, cube);
    assert!(after.y < released_at.y);
    assert!(context.physics().linear_velocity(body).unwrap().y < 0.0);
}

#[test]
fn test_pointer_on_empty_space_does_nothing() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::ZERO);

    context.pointer_down(Vec2::new(10.0, 10.0));
    context.pointer_move(Vec2::new(30.0, 30.0));
    assert_eq!(context.interaction().selected(), None);
    assert_eq!(body_position(&context, cube), Vec3::ZERO);
}

#[test]
fn test_resize_updates_pointer_projection() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::new(-300.0, 200.0, 0.0));

    // In 800x600 pixel (200, 200) is world (-200, 100): a miss
    context.pointer_down(Vec2::new(200.0, 200.0));
    assert_eq!(context.interaction().selected(), None);
    context.pointer_up(Vec2::new(200.0, 200.0));

    // In 1000x800 the same pixel is world (-300, 200)
    context.resize_viewport(1000, 800);
    let ray = context.camera().ray_from_screen(Vec2::ZERO);
    assert_eq!(ray.origin.truncate(), Vec2::new(-500.0, 400.0));

    context.pointer_down(Vec2::new(200.0, 200.0));
    assert_eq!(context.interaction().selected(), Some(cube));
}

#[test]
fn test_impulse_mode_kicks_the_clicked_cube() {
    let mut context = context(ScenePreset::ImpulseCubes, 0);
    assert_eq!(context.interaction().name(), "impulse");
    let left = spawn_cube(&mut context, Vec3::new(-200.0, 0.0, 0.0));
    let right = spawn_cube(&mut context, Vec3::new(200.0, 0.0, 0.0));
    let left_body = context.registry().body_of(left).unwrap();
    let right_body = context.registry().body_of(right).unwrap();

    // Miss
    context.pointer_down(pixel_of(Vec3::new(0.0, 250.0, 0.0)));
    assert_eq!(context.physics().linear_velocity(left_body).unwrap(), Vec3::ZERO);
    assert_eq!(context.physics().linear_velocity(right_body).unwrap(), Vec3::ZERO);

    context.pointer_down(pixel_of(Vec3::new(-200.0, 0.0, 0.0)));
    context.pointer_up(pixel_of(Vec3::new(-200.0, 0.0, 0.0)));
    assert!(context.physics().linear_velocity(left_body).unwrap().y > 0.0);
    assert_eq!(context.physics().linear_velocity(right_body).unwrap(), Vec3::ZERO);
    assert_eq!(context.interaction().selected(), None);

    context.tick();
    assert!(body_position(&context, left).y > 0.0);
}

#[test]
fn test_stop_freezes_the_scene() {
    let mut context = context(ScenePreset::DragCubes, 0);
    let cube = spawn_cube(&mut context, Vec3::ZERO);
    let body = context.registry().body_of(cube).unwrap();

    context.pointer_down(pixel_of(Vec3::ZERO));
    context.tick();
    context.stop();
    assert!(!context.is_running());
    assert!(!context.physics().is_held(body).unwrap());

    let frozen = visual_transforms(&context);
    let ticks = context.ticks();
    for _ in 0..10 {
        assert_eq!(context.tick(), TickOutcome::Stopped);
    }
    context.advance(1.0 / 60.0);
    context.pointer_down(pixel_of(Vec3::ZERO));

    assert_eq!(visual_transforms(&context), frozen);
    assert_eq!(context.ticks(), ticks);
    assert_eq!(context.interaction().selected(), None);
}

/// Drive ticks until every requested model has been applied.
async fn tick_until_loaded(context: &mut SimulationContext) {
    for _ in 0..400 {
        context.tick();
        if context.pending_models() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("model load did not finish");
}

#[tokio::test]
async fn test_failed_model_load_leaves_registry_unchanged() {
    let mut context = context(ScenePreset::Model, 3);
    context.attach_model_requests(ModelRequests::new(Handle::current(), Arc::new(ColladaModelLoader::new())));

    assert!(context.request_model("assets/models/does-not-exist.dae"));
    assert_eq!(context.pending_models(), 1);
    tick_until_loaded(&mut context).await;

    assert_eq!(context.registry().len(), 3);
    assert!(context.take_new_models().is_empty());
}

struct BoxLoader;

#[async_trait]
impl AssetLoader<ModelData> for BoxLoader {
    async fn load(&self, _path: &Path) -> anyhow::Result<ModelData> {
        let corners = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        Ok(ModelData::from_triangles(vec![(corners, None)]).centered())
    }
}

#[tokio::test]
async fn test_loaded_model_becomes_one_pairing() {
    let mut context = context(ScenePreset::Model, 0);
    context.attach_model_requests(ModelRequests::new(Handle::current(), Arc::new(BoxLoader)));

    context.request_model("assets/models/box.dae");
    tick_until_loaded(&mut context).await;

    assert_eq!(context.registry().len(), 1);
    let pairing = context.registry().iter().next().unwrap();
    let body = pairing.body.unwrap();
    assert!(context.physics().contains(body));
    // Model scale 100 over a 2-unit box
    assert_eq!(pairing.visual.half_extents, Vec3::splat(100.0));

    let uploads = context.take_new_models();
    assert_eq!(uploads.len(), 1);
    assert!(context.take_new_models().is_empty());

    // The new pairing is synced like any other
    context.tick();
    let pairing = context.registry().iter().next().unwrap();
    assert_eq!(
        pairing.visual.transform,
        context.physics().body_transform(pairing.body.unwrap()).unwrap()
    );
}
