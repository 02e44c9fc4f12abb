pub mod camera;
pub mod engine;
pub mod light;
pub mod mesh;

pub use camera::{CameraUniform, OrthographicCamera};
pub use engine::RenderEngine;
pub use light::{LightUniform, Lighting};
