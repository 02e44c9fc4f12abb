use glam::Vec3;

use crate::utils::math::Transform;
use crate::world::registry::{ObjectId, VisualObjectRegistry};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3, // normalized
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Distance along the ray to the plane, if it is hit in front of the origin.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<f32> {
        let denom = plane.normal.dot(self.dir);
        if denom.abs() < 1e-8 {
            return None;
        }
        let t = (plane.point - self.origin).dot(plane.normal) / denom;
        (t >= 0.0).then_some(t)
    }

    /// Distance to an oriented box given by a transform and local half extents.
    pub fn intersect_box(&self, transform: &Transform, half_extents: Vec3) -> Option<f32> {
        // Slab test in the box's local frame
        let origin = transform.inverse_transform_point(self.origin);
        let dir = transform.inverse_transform_vector(self.dir);

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let h = half_extents[axis];
            if d.abs() < 1e-12 {
                if o < -h || o > h {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = {
                let a = (-h - o) * inv;
                let b = (h - o) * inv;
                if a < b { (a, b) } else { (b, a) }
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        // Origin inside the box counts as a hit at distance zero
        Some(t_min.max(0.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub point: Vec3,
}

impl Plane {
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            point,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    pub object: ObjectId,
    pub distance: f32,
    pub point: Vec3,
}

/// First visual object along the ray. Equal distances resolve to the oldest object.
pub fn pick(registry: &VisualObjectRegistry, ray: &Ray) -> Option<PickHit> {
    registry
        .visuals()
        .filter_map(|visual| {
            ray.intersect_box(&visual.transform, visual.half_extents)
                .map(|distance| PickHit {
                    object: visual.id,
                    distance,
                    point: ray.at(distance),
                })
        })
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.object.cmp(&b.object))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::registry::VisualDesc;
    use glam::Quat;

    #[test]
    fn test_ray_hits_axis_aligned_box() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 499.0), Vec3::NEG_Z);
        let t = ray
            .intersect_box(&Transform::IDENTITY, Vec3::splat(75.0))
            .unwrap();
        assert_eq!(t, 424.0);
        assert_eq!(ray.at(t), Vec3::new(0.0, 0.0, 75.0));
    }

    #[test]
    fn test_ray_misses_box() {
        let ray = Ray::new(Vec3::new(100.0, 0.0, 499.0), Vec3::NEG_Z);
        assert!(ray.intersect_box(&Transform::IDENTITY, Vec3::splat(75.0)).is_none());
    }

    #[test]
    fn test_rotated_box_reaches_further() {
        // A cube turned 45 degrees about Z has corners sticking out along X
        let transform = Transform::new(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_4));
        let ray = Ray::new(Vec3::new(90.0, 0.0, 499.0), Vec3::NEG_Z);
        assert!(ray.intersect_box(&transform, Vec3::splat(75.0)).is_some());
        assert!(ray.intersect_box(&Transform::IDENTITY, Vec3::splat(75.0)).is_none());
    }

    #[test]
    fn test_plane_behind_ray_is_ignored() {
        let plane = Plane::from_normal_and_point(Vec3::NEG_Z, Vec3::new(0.0, 0.0, 600.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 499.0), Vec3::NEG_Z);
        assert!(ray.intersect_plane(&plane).is_none());
    }

    #[test]
    fn test_pick_returns_nearest_object() {
        let mut registry = VisualObjectRegistry::new();
        let far = registry.insert_unpaired(VisualDesc::cube(
            Transform::from_position(Vec3::new(0.0, 0.0, -200.0)),
            50.0,
        ));
        let near = registry.insert_unpaired(VisualDesc::cube(Transform::IDENTITY, 50.0));
        registry.insert_unpaired(VisualDesc::cube(
            Transform::from_position(Vec3::new(300.0, 0.0, 0.0)),
            50.0,
        ));

        let ray = Ray::new(Vec3::new(0.0, 0.0, 499.0), Vec3::NEG_Z);
        let hit = pick(&registry, &ray).unwrap();
        assert_eq!(hit.object, near);
        assert_ne!(hit.object, far);
        assert_eq!(hit.point.z, 25.0);
    }

    #[test]
    fn test_pick_empty_space() {
        let mut registry = VisualObjectRegistry::new();
        registry.insert_unpaired(VisualDesc::cube(Transform::IDENTITY, 50.0));
        let ray = Ray::new(Vec3::new(-300.0, 0.0, 499.0), Vec3::NEG_Z);
        assert!(pick(&registry, &ray).is_none());
    }
}
