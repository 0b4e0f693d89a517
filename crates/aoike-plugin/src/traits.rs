//! Trait definitions for host plugins.

use std::path::PathBuf;

use crate::config::ResolvedConfig;

/// Result of a transform hook.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    /// Replacement module source
    pub code: String,

    /// Optional source map
    pub map: Option<String>,
}

impl TransformResult {
    /// Create a transform result with code only.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Error raised by a plugin hook.
#[derive(Debug, thiserror::Error)]
#[error("[{plugin}] {hook}: {message}")]
pub struct PluginError {
    /// Plugin name that caused the error
    pub plugin: String,
    /// Hook that failed
    pub hook: &'static str,
    /// Error message
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            message: message.into(),
        }
    }
}

/// Dev server surface exposed to `configure_server`.
#[derive(Debug, Clone, Default)]
pub struct ServerContext {
    /// Project root being served
    pub root: PathBuf,

    /// Extra paths the file watcher should observe
    pub watch_paths: Vec<PathBuf>,

    /// Extra headers added to every response
    pub headers: Vec<(String, String)>,
}

/// A plugin registered with the host.
///
/// Every hook has a no-op default, so a plugin only implements what it needs.
pub trait Plugin: Send + Sync {
    /// Plugin name for logs and error messages.
    fn name(&self) -> &str;

    /// Called once with the final configuration.
    fn config_resolved(&self, _config: &ResolvedConfig) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called once before the dev server binds.
    fn configure_server(&self, _server: &mut ServerContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Transform module source.
    ///
    /// Return `Some(result)` to replace the code, or `None` to pass it through.
    fn transform(&self, _code: &str, _id: &str) -> Result<Option<TransformResult>, PluginError> {
        Ok(None)
    }
}
