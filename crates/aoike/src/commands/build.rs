//! Static site build command.

use std::sync::Arc;

use anyhow::Result;
use aoike_plugin::{resolve_config, BuildConfiguration};
use aoike_static::{BuildResult, StaticBuilder};

use crate::config::build_configuration;

/// Run the build command.
pub async fn run() -> Result<()> {
    tracing::info!("Building blog...");

    let result = build(build_configuration()).await?;

    tracing::info!(
        "Built {} pages and {} modules ({} transformed) in {}ms",
        result.pages,
        result.modules,
        result.transformed,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}

async fn build(configuration: BuildConfiguration) -> Result<BuildResult> {
    let (config, plugins) = resolve_config(configuration)?;

    Ok(StaticBuilder::new(config, Arc::new(plugins)).build().await?)
}
