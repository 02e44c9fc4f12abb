use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use wgpu::util::DeviceExt;

use crate::assets::ModelData;
use crate::world::registry::{VisualKind, VisualObject};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Per-object data: model matrix columns and a tint whose w flags texturing.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        5 => Float32x4, 6 => Float32x4, 7 => Float32x4, 8 => Float32x4, 9 => Float32x4
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }

    pub fn from_visual(visual: &VisualObject) -> Self {
        let tint = match visual.kind {
            VisualKind::Cube => Vec4::new(1.0, 1.0, 1.0, 1.0),
            VisualKind::Model(_) => Vec4::new(0.8, 0.8, 0.8, 0.0),
        };
        Self {
            model: visual.transform.to_matrix(visual.scale).to_cols_array_2d(),
            tint: tint.to_array(),
        }
    }
}

/// Unit cube centred on the origin, four vertices per face so each face gets
/// its own normal and full texture.
pub fn unit_cube() -> (Vec<Vertex>, Vec<u32>) {
    // (normal, u axis, v axis)
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let n = glam::Vec3::from_array(normal);
        let u = glam::Vec3::from_array(u);
        let v = glam::Vec3::from_array(v);
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (n + u * su + v * sv) * 0.5;
            vertices.push(Vertex {
                position: position.to_array(),
                normal,
                tex_coords: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

pub fn model_vertices(model: &ModelData) -> Vec<Vertex> {
    model
        .positions
        .iter()
        .zip(&model.normals)
        .map(|(position, normal)| Vertex {
            position: *position,
            normal: *normal,
            tex_coords: [0.0, 0.0],
        })
        .collect()
}

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, label: &str, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }

    pub fn cube(device: &wgpu::Device) -> Self {
        let (vertices, indices) = unit_cube();
        Self::new(device, "Cube", &vertices, &indices)
    }

    pub fn from_model(device: &wgpu::Device, label: &str, model: &ModelData) -> Self {
        Self::new(device, label, &model_vertices(model), &model.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::Transform;
    use crate::world::registry::{ModelId, VisualDesc, VisualObjectRegistry};
    use glam::Vec3;

    #[test]
    fn test_unit_cube_faces_point_outwards() {
        let (vertices, indices) = unit_cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);

        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(vertices[i as usize].position));
            let winding = (b - a).cross(c - a);
            let normal = Vec3::from_array(vertices[tri[0] as usize].normal);
            assert!(winding.dot(normal) > 0.0, "clockwise triangle {:?}", tri);
        }
        assert!(vertices
            .iter()
            .all(|v| v.position.iter().all(|c| c.abs() == 0.5)));
    }

    #[test]
    fn test_instance_matrix_scales_and_translates() {
        let mut registry = VisualObjectRegistry::new();
        let id = registry.insert_unpaired(VisualDesc::model(
            ModelId(3),
            Transform::from_position(Vec3::new(10.0, 20.0, 0.0)),
            150.0,
            Vec3::splat(75.0),
        ));
        let instance = InstanceRaw::from_visual(registry.visual(id).unwrap());
        assert_eq!(instance.model[0][0], 150.0);
        assert_eq!(instance.model[3], [10.0, 20.0, 0.0, 1.0]);
        assert_eq!(instance.tint[3], 0.0);
    }
}
