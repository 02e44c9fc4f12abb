use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::RenderingSettings;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LightUniform {
    /// Ambient colour pre-multiplied by intensity; w unused.
    pub ambient: [f32; 4],
    /// Directional colour pre-multiplied by intensity; w unused.
    pub directional: [f32; 4],
    /// Unit vector pointing towards the directional light.
    pub direction: [f32; 4],
    /// x: texture repeat factor.
    pub params: [f32; 4],
}

/// Ambient fill plus one directional light aimed at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: Vec3,
    pub directional: Vec3,
    pub position: Vec3,
    pub texture_repeat: f32,
}

impl Lighting {
    pub fn from_settings(settings: &RenderingSettings, texture_repeat: f32) -> Self {
        Self {
            ambient: Vec3::from_array(settings.ambient_color) * settings.ambient_intensity,
            directional: Vec3::from_array(settings.directional_color) * settings.directional_intensity,
            position: Vec3::from_array(settings.directional_position),
            texture_repeat,
        }
    }

    pub fn to_uniform(&self) -> LightUniform {
        LightUniform {
            ambient: self.ambient.extend(0.0).to_array(),
            directional: self.directional.extend(0.0).to_array(),
            direction: self.position.normalize_or(Vec3::Z).extend(0.0).to_array(),
            params: [self.texture_repeat, 0.0, 0.0, 0.0],
        }
    }
}
