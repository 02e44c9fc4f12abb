use std::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use serde::{Serialize, Deserialize};

use crate::interaction::InteractionMode;

const SCENE_CONFIG_FILE: &str = "scene.toml";
const ENV_PREFIX: &str = "CUBEFALL";

// =============================================================================
// Scene Configuration System
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenePreset {
    DragCubes,    // Falling cubes, grabbed and dragged with the pointer
    ImpulseCubes, // Falling cubes, kicked on click
    Model,        // A single loaded model, grabbed and dragged
}

impl Default for ScenePreset {
    fn default() -> Self {
        Self::DragCubes
    }
}

impl std::str::FromStr for ScenePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "drag" | "dragcubes" => Ok(Self::DragCubes),
            "impulse" | "impulsecubes" => Ok(Self::ImpulseCubes),
            "model" => Ok(Self::Model),
            other => Err(format!("unknown scene preset '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsSettings {
    pub gravity: [f32; 3],
    pub friction: f32,
    pub restitution: f32,
    pub timestep: f32,
    /// Scale of "one unit" for solver tolerances; scenes are laid out in pixels.
    pub length_unit: f32,
    pub ccd_enabled: bool,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -2500.0, 0.0],
            friction: 0.3,
            restitution: 0.1,
            timestep: 1.0 / 60.0,
            length_unit: 100.0,
            ccd_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneLayout {
    pub cube_count: usize,
    pub cube_size: f32,
    pub cube_mass: f32,
    pub cube_linear_damping: f32,
    pub model_mass: f32,
    pub model_scale: f32,
    /// Fixed seed for cube placement; random when unset.
    pub seed: Option<u64>,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            cube_count: 100,
            cube_size: 150.0,
            cube_mass: 5.0,
            cube_linear_damping: 0.1,
            model_mass: 5.0,
            model_scale: 100.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionSettings {
    pub mode: InteractionMode,
    pub impulse: [f32; 3],
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            mode: InteractionMode::Drag,
            impulse: [0.0, 15000.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingSettings {
    pub window_width: u32,
    pub window_height: u32,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub directional_color: [f32; 3],
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
    pub clear_color: [f64; 4],
    pub vsync_enabled: bool,
}

impl Default for RenderingSettings {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 800,
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.5,
            directional_color: [1.0, 1.0, 1.0],
            directional_intensity: 0.5,
            directional_position: [0.0, 0.0, 100.0],
            clear_color: [0.0, 0.0, 0.0, 0.0],
            vsync_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSettings {
    /// Local path or http(s) URL of the cube texture.
    pub cube_texture: Option<String>,
    pub texture_repeat: f32,
    pub model_path: Option<PathBuf>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            cube_texture: Some("assets/textures/cube.jpg".to_string()),
            texture_repeat: 0.1,
            model_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSettings {
    pub preset: ScenePreset,
    pub physics: PhysicsSettings,
    pub scene: SceneLayout,
    pub interaction: InteractionSettings,
    pub rendering: RenderingSettings,
    pub assets: AssetSettings,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self::for_preset(ScenePreset::default())
    }
}

impl SceneSettings {
    /// Create scene settings for a specific preset
    pub fn for_preset(preset: ScenePreset) -> Self {
        let (scene, interaction, assets) = match preset {
            ScenePreset::DragCubes => (
                SceneLayout::default(),
                InteractionSettings::default(),
                AssetSettings::default(),
            ),
            ScenePreset::ImpulseCubes => (
                SceneLayout::default(),
                InteractionSettings {
                    mode: InteractionMode::Impulse,
                    ..InteractionSettings::default()
                },
                AssetSettings::default(),
            ),
            ScenePreset::Model => (
                SceneLayout {
                    cube_count: 0,
                    ..SceneLayout::default()
                },
                InteractionSettings::default(),
                AssetSettings {
                    cube_texture: None,
                    model_path: Some(PathBuf::from("assets/models/model.dae")),
                    ..AssetSettings::default()
                },
            ),
        };

        Self {
            preset,
            physics: PhysicsSettings::default(),
            scene,
            interaction,
            rendering: RenderingSettings::default(),
            assets,
        }
    }
}

// Scene configuration file management
pub fn scene_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "cubefall", "cubefall")
        .map(|proj| proj.config_dir().join(SCENE_CONFIG_FILE))
}

pub fn save_scene_settings_to(path: &Path, settings: &SceneSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, toml)
}

pub fn save_scene_settings(settings: &SceneSettings) -> std::io::Result<()> {
    if let Some(path) = scene_config_path() {
        save_scene_settings_to(&path, settings)?;
    }
    Ok(())
}

pub fn load_scene_settings_from(path: &Path) -> Option<SceneSettings> {
    let data = fs::read_to_string(path).ok()?;
    match toml::from_str::<SceneSettings>(&data) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("Ignoring malformed scene settings {:?}: {}", path, e);
            None
        }
    }
}

pub fn load_scene_settings() -> Option<SceneSettings> {
    scene_config_path().and_then(|path| load_scene_settings_from(&path))
}

/// Build the effective settings: preset defaults, then the settings file, then
/// `CUBEFALL__SECTION__KEY` environment overrides.
pub fn resolve_scene_settings(
    preset: ScenePreset,
    file: Option<&Path>,
) -> Result<SceneSettings, config::ConfigError> {
    let defaults = config::Config::try_from(&SceneSettings::for_preset(preset))?;

    let mut builder = config::Config::builder().add_source(defaults);
    if let Some(path) = file {
        builder = builder.add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(false),
        );
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
