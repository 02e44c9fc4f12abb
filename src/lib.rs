// Cubefall: falling cubes you can grab, drag or kick around

pub mod app;
pub mod assets;
pub mod config;
pub mod interaction;
pub mod rendering;
pub mod utils;
pub mod world;

pub use config::{resolve_scene_settings, ScenePreset, SceneSettings};
pub use interaction::{create_strategy, InteractionMode, InteractionStrategy};
pub use world::{SimulationContext, TickOutcome, WorldError, WorldResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
