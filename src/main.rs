use anyhow::Context;
use tracing::info;

use cubefall::config::{resolve_scene_settings, scene_config_path, ScenePreset};
use cubefall::utils::logging::{init_logging, log_system_info};

fn main() -> anyhow::Result<()> {
    init_logging();
    log_system_info();

    let preset = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<ScenePreset>().map_err(anyhow::Error::msg)?,
        None => ScenePreset::default(),
    };
    let config_path = scene_config_path();
    let settings = resolve_scene_settings(preset, config_path.as_deref())
        .context("Failed to resolve scene settings")?;
    info!("Starting {} {} with {:?} preset", cubefall::APP_NAME, cubefall::VERSION, settings.preset);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("cubefall-assets")
        .build()
        .context("Failed to start async runtime")?;

    cubefall::app::run(settings, runtime.handle().clone())
}
