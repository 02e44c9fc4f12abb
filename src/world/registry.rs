//! Visual objects and their pairing with physics bodies.
//!
//! Pairings are keyed by object identity, so looking up the body behind a
//! picked object never depends on collection order.

use std::collections::HashMap;
use std::fmt;

use glam::Vec3;
use tracing::debug;

use super::physics::BodyHandle;
use super::{WorldError, WorldResult};
use crate::utils::math::Transform;

/// Identity of a visual object, unique for the lifetime of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a loaded model's geometry held by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Cube,
    Model(ModelId),
}

/// Everything the registry needs to create a visual object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualDesc {
    pub kind: VisualKind,
    pub transform: Transform,
    /// Mesh scale applied by the renderer.
    pub scale: Vec3,
    /// Local-space pick box.
    pub half_extents: Vec3,
}

impl VisualDesc {
    /// A cube drawn from the unit cube mesh.
    pub fn cube(transform: Transform, size: f32) -> Self {
        Self {
            kind: VisualKind::Cube,
            transform,
            scale: Vec3::splat(size),
            half_extents: Vec3::splat(size * 0.5),
        }
    }

    pub fn model(model: ModelId, transform: Transform, scale: f32, half_extents: Vec3) -> Self {
        Self {
            kind: VisualKind::Model(model),
            transform,
            scale: Vec3::splat(scale),
            half_extents,
        }
    }
}

/// Something the renderer draws.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualObject {
    pub id: ObjectId,
    pub kind: VisualKind,
    pub transform: Transform,
    pub scale: Vec3,
    pub half_extents: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    pub visual: VisualObject,
    pub body: Option<BodyHandle>,
}

#[derive(Default)]
pub struct VisualObjectRegistry {
    pairings: HashMap<ObjectId, Pairing>,
    by_body: HashMap<BodyHandle, ObjectId>,
    next_id: u64,
}

impl VisualObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    /// Register a visual object mirrored by `body`.
    pub fn insert_paired(&mut self, desc: VisualDesc, body: BodyHandle) -> WorldResult<ObjectId> {
        if let Some(existing) = self.by_body.get(&body) {
            return Err(WorldError::BodyAlreadyPaired { handle: body, object: *existing });
        }
        let id = self.insert(desc, Some(body));
        self.by_body.insert(body, id);
        Ok(id)
    }

    /// Register a visual object with no body; the sync loop leaves it alone.
    pub fn insert_unpaired(&mut self, desc: VisualDesc) -> ObjectId {
        self.insert(desc, None)
    }

    fn insert(&mut self, desc: VisualDesc, body: Option<BodyHandle>) -> ObjectId {
        let id = self.allocate_id();
        self.pairings.insert(
            id,
            Pairing {
                visual: VisualObject {
                    id,
                    kind: desc.kind,
                    transform: desc.transform,
                    scale: desc.scale,
                    half_extents: desc.half_extents,
                },
                body,
            },
        );
        debug!("Registered visual object {} ({:?}, paired: {})", id, desc.kind, body.is_some());
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> WorldResult<Pairing> {
        let pairing = self
            .pairings
            .remove(&id)
            .ok_or(WorldError::UnknownObject { id })?;
        if let Some(body) = pairing.body {
            self.by_body.remove(&body);
        }
        Ok(pairing)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Pairing> {
        self.pairings.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Pairing> {
        self.pairings.get_mut(&id)
    }

    pub fn visual(&self, id: ObjectId) -> Option<&VisualObject> {
        self.pairings.get(&id).map(|p| &p.visual)
    }

    pub fn body_of(&self, id: ObjectId) -> Option<BodyHandle> {
        self.pairings.get(&id).and_then(|p| p.body)
    }

    pub fn object_of(&self, body: BodyHandle) -> Option<ObjectId> {
        self.by_body.get(&body).copied()
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pairing> {
        self.pairings.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pairing> {
        self.pairings.values_mut()
    }

    pub fn visuals(&self) -> impl Iterator<Item = &VisualObject> {
        self.pairings.values().map(|p| &p.visual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsSettings;
    use crate::world::physics::{BodyDesc, PhysicsWorld};

    #[test]
    fn test_lookup_survives_removal_of_other_objects() {
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let mut registry = VisualObjectRegistry::new();

        let mut ids = Vec::new();
        let mut bodies = Vec::new();
        for i in 0..4 {
            let body = physics.add_body(BodyDesc::cuboid(Vec3::splat(5.0), 1.0)).unwrap();
            let transform = Transform::from_position(Vec3::new(i as f32, 0.0, 0.0));
            ids.push(registry.insert_paired(VisualDesc::cube(transform, 10.0), body).unwrap());
            bodies.push(body);
        }

        registry.remove(ids[1]).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.body_of(ids[3]), Some(bodies[3]));
        assert_eq!(registry.object_of(bodies[2]), Some(ids[2]));
        assert_eq!(registry.object_of(bodies[1]), None);
    }

    #[test]
    fn test_body_can_only_be_paired_once() {
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let mut registry = VisualObjectRegistry::new();
        let body = physics.add_body(BodyDesc::cuboid(Vec3::splat(5.0), 1.0)).unwrap();

        registry
            .insert_paired(VisualDesc::cube(Transform::IDENTITY, 10.0), body)
            .unwrap();
        let second = registry.insert_paired(VisualDesc::cube(Transform::IDENTITY, 10.0), body);
        assert!(matches!(second, Err(WorldError::BodyAlreadyPaired { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unpaired_objects_have_no_body() {
        let mut registry = VisualObjectRegistry::new();
        let id = registry.insert_unpaired(VisualDesc::cube(Transform::IDENTITY, 2.0));
        assert_eq!(registry.body_of(id), None);
        assert!(registry.visual(id).is_some());
        assert!(matches!(
            registry.remove(ObjectId(999)),
            Err(WorldError::UnknownObject { .. })
        ));
    }
}
