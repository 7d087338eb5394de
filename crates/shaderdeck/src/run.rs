use std::path::PathBuf;

use anyhow::Result;
use renderer::{Renderer, RendererConfig};
use shaderset::ShaderCycle;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, DEFAULT_SHADER_PATH};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let target = cli
        .shader
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SHADER_PATH));
    tracing::debug!(target = %target.display(), "resolving shader set");

    let shaders = ShaderCycle::new(&target)?;
    tracing::info!(
        target = %target.display(),
        candidates = shaders.len(),
        "resolved shader set"
    );

    let config = RendererConfig {
        surface_size: cli.size.unwrap_or(RendererConfig::default().surface_size),
        target_fps: match cli.fps {
            Some(v) if v > 0.0 => Some(v),
            _ => None,
        },
    };

    Renderer::new(config, shaders).run()
}
