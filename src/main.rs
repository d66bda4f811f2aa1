use socket_viewer::{ViewerApp, ViewerConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::from_env()?;
    log::info!(
        "Starting with static mesh '{}' and movable mesh '{}'",
        config.assets.static_mesh,
        config.assets.movable_mesh
    );

    ViewerApp::new(config)?.run()
}
