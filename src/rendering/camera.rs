use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use tracing::debug;

use crate::interaction::picking::Ray;

pub const CAMERA_DISTANCE: f32 = 500.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 1000.0;

/// Orthographic camera whose frustum is exactly one world unit per viewport
/// pixel, centred on the origin and looking down -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    pub position: Vec3,
    width: f32,
    height: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl OrthographicCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            znear: CAMERA_NEAR,
            zfar: CAMERA_FAR,
        }
    }

    /// Track a new viewport size. Zero-sized viewports (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width as f32;
        self.height = height as f32;
        debug!("Camera viewport resized to {}x{}", width, height);
    }

    pub fn viewport(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::NEG_Z
    }

    pub fn build_projection_matrix(&self) -> Mat4 {
        let half_w = self.width * 0.5;
        let half_h = self.height * 0.5;
        Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.znear, self.zfar)
    }

    pub fn build_view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        self.build_projection_matrix() * self.build_view_matrix()
    }

    /// Viewport pixel (origin top-left, y down) to normalized device coordinates.
    pub fn screen_to_ndc(&self, pixel: Vec2) -> Vec2 {
        Vec2::new(
            pixel.x / self.width * 2.0 - 1.0,
            1.0 - pixel.y / self.height * 2.0,
        )
    }

    /// World-space ray leaving the near plane under a viewport pixel.
    pub fn ray_from_screen(&self, pixel: Vec2) -> Ray {
        // One world unit per pixel, so skip the round trip through NDC
        let origin = Vec3::new(
            self.position.x + pixel.x - self.width * 0.5,
            self.position.y + self.height * 0.5 - pixel.y,
            self.position.z - self.znear,
        );
        Ray::new(origin, self.forward())
    }

    /// Left edge, right edge, top and bottom of the visible world rectangle.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let half_w = self.width * 0.5;
        let half_h = self.height * 0.5;
        (
            self.position.x - half_w,
            self.position.x + half_w,
            self.position.y + half_h,
            self.position.y - half_h,
        )
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &OrthographicCamera) -> Self {
        Self {
            view_proj: camera.build_view_projection_matrix().to_cols_array_2d(),
            eye: camera.position.extend(1.0).to_array(),
        }
    }
}
