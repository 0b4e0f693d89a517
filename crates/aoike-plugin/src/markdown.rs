//! Markdown-to-module transform.
//!
//! Turns `post.md` into a module whose default export is the raw Markdown
//! text, so pages can `import post from "./post.md"`.

use crate::config::ResolvedConfig;
use crate::traits::{Plugin, PluginError, ServerContext, TransformResult};

/// The aoike plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct AoikePlugin;

impl AoikePlugin {
    pub const NAME: &'static str = "aoike";

    pub fn new() -> Self {
        Self
    }
}

impl Plugin for AoikePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config_resolved(&self, _config: &ResolvedConfig) -> Result<(), PluginError> {
        Ok(())
    }

    fn configure_server(&self, _server: &mut ServerContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn transform(&self, code: &str, id: &str) -> Result<Option<TransformResult>, PluginError> {
        tracing::info!("transform: {}", id);

        // Case-sensitive: `x.MD` passes through
        if !id.ends_with(".md") {
            return Ok(None);
        }

        let literal = serde_json::to_string(code)
            .map_err(|e| PluginError::new(Self::NAME, "transform", e.to_string()))?;

        Ok(Some(TransformResult::code(format!(
            "export default {};",
            literal
        ))))
    }
}
