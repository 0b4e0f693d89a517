//! Ordered plugin container.

use std::fmt;
use std::sync::Arc;

use crate::config::ResolvedConfig;
use crate::traits::{Plugin, PluginError, ServerContext, TransformResult};

/// Holds the registered plugins and dispatches hooks in insertion order.
#[derive(Clone, Default)]
pub struct PluginContainer {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginContainer {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    /// Names of all registered plugins.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Call `config_resolved` on all plugins.
    pub fn config_resolved(&self, config: &ResolvedConfig) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.config_resolved(config)?;
        }
        Ok(())
    }

    /// Call `configure_server` on all plugins.
    pub fn configure_server(&self, server: &mut ServerContext) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.configure_server(server)?;
        }
        Ok(())
    }

    /// Transform code through all plugins.
    ///
    /// Each plugin sees the previous plugin's output. Returns `None` when no
    /// plugin replaced the code.
    pub fn transform(&self, code: &str, id: &str) -> Result<Option<TransformResult>, PluginError> {
        let mut current: Option<TransformResult> = None;

        for plugin in &self.plugins {
            let input = current.as_ref().map_or(code, |r| r.code.as_str());
            if let Some(result) = plugin.transform(input, id)? {
                current = Some(result);
            }
        }

        Ok(current)
    }
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContainer")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Suffix(&'static str);

    impl Plugin for Suffix {
        fn name(&self) -> &str {
            self.0
        }

        fn transform(&self, code: &str, id: &str) -> Result<Option<TransformResult>, PluginError> {
            if id.ends_with(".txt") {
                Ok(Some(TransformResult::code(format!("{}{}", code, self.0))))
            } else {
                Ok(None)
            }
        }
    }

    struct Failing;

    impl Plugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn configure_server(&self, _server: &mut ServerContext) -> Result<(), PluginError> {
            Err(PluginError::new(self.name(), "configure_server", "nope"))
        }
    }

    struct Watcher;

    impl Plugin for Watcher {
        fn name(&self) -> &str {
            "watcher"
        }

        fn configure_server(&self, server: &mut ServerContext) -> Result<(), PluginError> {
            server.watch_paths.push(server.root.join("content"));
            Ok(())
        }
    }

    #[test]
    fn chains_transforms_in_order() {
        let container = PluginContainer::new(vec![Arc::new(Suffix("a")), Arc::new(Suffix("b"))]);

        let result = container.transform("x", "note.txt").unwrap().unwrap();

        assert_eq!(result.code, "xab");
        assert_eq!(container.names(), vec!["a", "b"]);
    }

    #[test]
    fn passes_through_unhandled_ids() {
        let container = PluginContainer::new(vec![Arc::new(Suffix("a"))]);

        assert_eq!(container.transform("x", "main.ts").unwrap(), None);
    }

    #[test]
    fn configure_server_collects_watch_paths() {
        let container = PluginContainer::new(vec![Arc::new(Watcher)]);
        let mut server = ServerContext {
            root: "site".into(),
            ..Default::default()
        };

        container.configure_server(&mut server).unwrap();

        assert_eq!(server.watch_paths, vec![std::path::PathBuf::from("site/content")]);
    }

    #[test]
    fn stops_on_first_hook_error() {
        let container = PluginContainer::new(vec![Arc::new(Failing), Arc::new(Watcher)]);
        let mut server = ServerContext::default();

        let err = container.configure_server(&mut server).unwrap_err();

        assert_eq!(err.plugin, "failing");
        assert!(server.watch_paths.is_empty());
    }
}
