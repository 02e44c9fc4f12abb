use std::path::{Path, PathBuf};

use async_trait::async_trait;
use collada::document::ColladaDocument;
use collada::{PrimitiveElement, Shape};
use glam::Vec3;
use tracing::{error, info};

use super::manager::AssetLoader;
use super::AssetError;

/// Flat triangle soup ready for upload: three vertices per triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl ModelData {
    /// Build from triangles, using the face normal where none is supplied.
    pub fn from_triangles<I>(triangles: I) -> Self
    where
        I: IntoIterator<Item = ([Vec3; 3], Option<[Vec3; 3]>)>,
    {
        let mut data = ModelData::default();
        for (corners, normals) in triangles {
            let face_normal = (corners[1] - corners[0])
                .cross(corners[2] - corners[0])
                .normalize_or_zero();
            let normals = normals.unwrap_or([face_normal; 3]);
            for (corner, normal) in corners.iter().zip(normals.iter()) {
                data.indices.push(data.positions.len() as u32);
                data.positions.push(corner.to_array());
                data.normals.push(normal.normalize_or_zero().to_array());
            }
        }
        data
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds as (min, max).
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut iter = self.positions.iter().map(|p| Vec3::from_array(*p));
        let Some(first) = iter.next() else {
            return (Vec3::ZERO, Vec3::ZERO);
        };
        iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)))
    }

    pub fn half_extents(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (max - min) * 0.5
    }

    /// Move the geometry so its bounding box is centred on the origin, which is
    /// where its rigid body's centre will be.
    pub fn centered(mut self) -> Self {
        let (min, max) = self.bounds();
        let centre = (min + max) * 0.5;
        for p in &mut self.positions {
            *p = (Vec3::from_array(*p) - centre).to_array();
        }
        self
    }
}

fn vertex(v: &collada::Vertex) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32)
}

fn normal(n: &collada::Normal) -> Vec3 {
    Vec3::new(n.x as f32, n.y as f32, n.z as f32)
}

/// Flatten every object of a COLLADA document into one model.
pub fn parse_collada(path: &Path, xml: &str) -> Result<ModelData, AssetError> {
    let document = ColladaDocument::from_str(xml).map_err(|reason| AssetError::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    })?;
    let obj_set = document.get_obj_set().ok_or_else(|| AssetError::Parse {
        path: path.to_path_buf(),
        reason: "document has no geometry library".to_string(),
    })?;

    let mut triangles = Vec::new();
    for object in &obj_set.objects {
        let position_at = |index: usize| object.vertices.get(index).map(vertex);
        let normal_at = |index: Option<usize>| index.and_then(|i| object.normals.get(i)).map(normal);

        for geometry in &object.geometry {
            for element in &geometry.mesh {
                match element {
                    PrimitiveElement::Triangles(tris) => {
                        for (i, (a, b, c)) in tris.vertices.iter().enumerate() {
                            let (Some(pa), Some(pb), Some(pc)) = (position_at(*a), position_at(*b), position_at(*c)) else {
                                continue;
                            };
                            let normals = tris.normals.as_ref().and_then(|n| n.get(i)).and_then(|(na, nb, nc)| {
                                Some([normal_at(Some(*na))?, normal_at(Some(*nb))?, normal_at(Some(*nc))?])
                            });
                            triangles.push(([pa, pb, pc], normals));
                        }
                    }
                    PrimitiveElement::Polylist(polylist) => {
                        for shape in &polylist.shapes {
                            let Shape::Triangle(a, b, c) = shape else {
                                continue;
                            };
                            let (Some(pa), Some(pb), Some(pc)) = (position_at(a.0), position_at(b.0), position_at(c.0)) else {
                                continue;
                            };
                            let normals = (|| Some([normal_at(a.2)?, normal_at(b.2)?, normal_at(c.2)?]))();
                            triangles.push(([pa, pb, pc], normals));
                        }
                    }
                }
            }
        }
    }

    let data = ModelData::from_triangles(triangles);
    if data.is_empty() {
        return Err(AssetError::EmptyModel { path: path.to_path_buf() });
    }
    Ok(data.centered())
}

pub struct ColladaModelLoader;

impl ColladaModelLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ColladaModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetLoader<ModelData> for ColladaModelLoader {
    async fn load(&self, path: &Path) -> anyhow::Result<ModelData> {
        let xml = tokio::fs::read_to_string(path).await.map_err(|source| AssetError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        match parse_collada(path, &xml) {
            Ok(model) => {
                info!("Loaded model {:?}: {} triangles", path, model.triangle_count());
                Ok(model)
            }
            Err(e) => {
                error!("Failed to load model {:?}: {}", path, e);
                Err(e.into())
            }
        }
    }
}
