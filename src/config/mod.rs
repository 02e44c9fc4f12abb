pub mod settings;

// Re-export commonly used types
pub use settings::{
    ScenePreset, SceneSettings, PhysicsSettings, SceneLayout, InteractionSettings,
    RenderingSettings, AssetSettings,
    save_scene_settings, save_scene_settings_to, load_scene_settings, load_scene_settings_from,
    resolve_scene_settings, scene_config_path,
};
