//! Build configuration and its resolution.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::container::PluginContainer;
use crate::traits::{Plugin, PluginError};

/// On-disk configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "aoike.toml";

/// Static description handed to the host.
#[derive(Clone)]
pub struct BuildConfiguration {
    /// Project root, relative to the working directory or absolute
    pub project_root: PathBuf,

    /// Path aliases: `("@", "/abs/theme")`
    pub aliases: Vec<(String, PathBuf)>,

    /// Ordered plugin list
    pub plugins: Vec<Arc<dyn Plugin>>,

    /// Skip reading `aoike.toml` from the project root
    pub config_file_disabled: bool,
}

impl fmt::Debug for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("BuildConfiguration")
            .field("project_root", &self.project_root)
            .field("aliases", &self.aliases)
            .field("plugins", &plugins)
            .field("config_file_disabled", &self.config_file_disabled)
            .finish()
    }
}

/// A path alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Symbolic prefix, e.g. `@`
    pub find: String,

    /// Directory the prefix maps to
    pub replacement: PathBuf,
}

/// Dev server bind options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to bind
    pub host: String,

    /// Port to bind, 0 picks a free port
    pub port: u16,

    /// Host name shown in the served URL
    pub display_host: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5173,
            display_host: "localhost".to_string(),
        }
    }
}

/// Configuration after defaults and the optional config file are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub root: PathBuf,
    pub aliases: Vec<Alias>,
    pub out_dir: PathBuf,
    /// Public base path, always ends with `/`
    pub base: String,
    /// Site title
    pub title: String,
    /// Minify CSS in builds
    pub minify: bool,
    pub server: ServerOptions,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::with_root(PathBuf::from("."))
    }
}

impl ResolvedConfig {
    fn with_root(root: PathBuf) -> Self {
        Self {
            out_dir: root.join("dist"),
            root,
            aliases: Vec::new(),
            base: "/".to_string(),
            title: "Aoike".to_string(),
            minify: true,
            server: ServerOptions::default(),
        }
    }

    /// Map a root-relative request path through the aliases.
    ///
    /// `@/main.css` resolves to `<replacement>/main.css` when `@` is an alias.
    pub fn resolve_alias(&self, request: &str) -> Option<PathBuf> {
        self.split_alias(request)
            .map(|(alias, rest)| alias.replacement.join(rest))
    }

    /// Find the alias matching `request` and the path left after its prefix.
    ///
    /// The remainder never starts with `/`, so joining it stays under the
    /// alias directory.
    pub fn split_alias<'a>(&self, request: &'a str) -> Option<(&Alias, &'a str)> {
        let request = request.trim_start_matches('/');

        self.aliases.iter().find_map(|alias| {
            if request == alias.find {
                return Some((alias, ""));
            }
            request
                .strip_prefix(alias.find.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| (alias, rest.trim_start_matches('/')))
        })
    }

    fn set_alias(&mut self, find: String, replacement: PathBuf) {
        match self.aliases.iter_mut().find(|a| a.find == find) {
            Some(existing) => existing.replacement = replacement,
            None => self.aliases.push(Alias { find, replacement }),
        }
    }
}

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// `aoike.toml` structure.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    title: Option<String>,
    out_dir: Option<String>,
    base: Option<String>,
    minify: Option<bool>,
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    alias: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

/// Load `aoike.toml` from the root if it exists.
/// Returns an error if the file exists but is malformed.
fn load_config_file(root: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(Some(file))
}

fn merge(resolved: &mut ResolvedConfig, file: ConfigFile) {
    if let Some(title) = file.title {
        resolved.title = title;
    }
    if let Some(out_dir) = file.out_dir {
        resolved.out_dir = resolved.root.join(out_dir);
    }
    if let Some(base) = file.base {
        resolved.base = if base.ends_with('/') {
            base
        } else {
            format!("{}/", base)
        };
    }
    if let Some(minify) = file.minify {
        resolved.minify = minify;
    }
    if let Some(host) = file.server.host {
        resolved.server.host = host;
    }
    if let Some(port) = file.server.port {
        resolved.server.port = port;
    }
    for (find, target) in file.alias {
        let replacement = resolved.root.join(target);
        resolved.set_alias(find, replacement);
    }
}

/// Resolve a build configuration.
///
/// Applies host defaults, merges `aoike.toml` unless the config file is
/// disabled, then runs every plugin's `config_resolved` hook.
pub fn resolve_config(
    config: BuildConfiguration,
) -> Result<(ResolvedConfig, PluginContainer), ConfigError> {
    let mut resolved = ResolvedConfig::with_root(config.project_root);

    for (find, replacement) in config.aliases {
        resolved.set_alias(find, replacement);
    }

    if !config.config_file_disabled {
        if let Some(file) = load_config_file(&resolved.root)? {
            merge(&mut resolved, file);
        }
    }

    let plugins = PluginContainer::new(config.plugins);
    plugins.config_resolved(&resolved)?;

    tracing::debug!(?resolved, plugins = ?plugins.names(), "Resolved configuration");

    Ok((resolved, plugins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
title = "From File"
out_dir = "public"

[server]
port = 8080

[alias]
"~" = "src"
"#;

    fn configuration(root: &Path, disabled: bool) -> BuildConfiguration {
        BuildConfiguration {
            project_root: root.to_path_buf(),
            aliases: vec![("@".to_string(), PathBuf::from("/opt/theme"))],
            plugins: vec![],
            config_file_disabled: disabled,
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn config_resolved(&self, config: &ResolvedConfig) -> Result<(), PluginError> {
            self.seen.lock().unwrap().push(config.title.clone());
            Ok(())
        }
    }

    #[test]
    fn disabled_config_file_keeps_literals() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), CONFIG).unwrap();

        let (resolved, _) = resolve_config(configuration(temp.path(), true)).unwrap();

        let mut expected = ResolvedConfig::with_root(temp.path().to_path_buf());
        expected.aliases = vec![Alias {
            find: "@".to_string(),
            replacement: PathBuf::from("/opt/theme"),
        }];
        assert_eq!(resolved, expected);
    }

    #[test]
    fn merges_config_file_when_enabled() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), CONFIG).unwrap();

        let (resolved, _) = resolve_config(configuration(temp.path(), false)).unwrap();

        assert_eq!(resolved.title, "From File");
        assert_eq!(resolved.out_dir, temp.path().join("public"));
        assert_eq!(resolved.server.port, 8080);
        assert_eq!(resolved.server.host, "127.0.0.1");
        assert_eq!(resolved.aliases.len(), 2);
        assert_eq!(
            resolved.resolve_alias("~/a.js"),
            Some(temp.path().join("src").join("a.js"))
        );
    }

    #[test]
    fn errors_on_malformed_config_file() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "title = [").unwrap();

        let result = resolve_config(configuration(temp.path(), false));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn runs_config_resolved_hooks() {
        let temp = tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut config = configuration(temp.path(), true);
        config.plugins.push(recorder.clone());

        let (_, plugins) = resolve_config(config).unwrap();

        assert_eq!(plugins.names(), vec!["recorder"]);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["Aoike".to_string()]);
    }

    #[test]
    fn resolves_alias_prefixes() {
        let mut config = ResolvedConfig::default();
        config.set_alias("@".to_string(), PathBuf::from("/opt/theme"));

        assert_eq!(
            config.resolve_alias("/@/css/main.css"),
            Some(PathBuf::from("/opt/theme/css/main.css"))
        );
        assert_eq!(config.resolve_alias("@"), Some(PathBuf::from("/opt/theme")));
        assert_eq!(config.resolve_alias("@scope/pkg.js"), None);
        assert_eq!(config.resolve_alias("posts/a.md"), None);
    }

    #[test]
    fn alias_remainder_stays_relative() {
        let mut config = ResolvedConfig::default();
        config.set_alias("@".to_string(), PathBuf::from("/opt/theme"));

        assert_eq!(
            config.resolve_alias("/@//etc/passwd"),
            Some(PathBuf::from("/opt/theme/etc/passwd"))
        );

        let (alias, rest) = config.split_alias("/@///main.css").unwrap();
        assert_eq!(alias.find, "@");
        assert_eq!(rest, "main.css");
    }
}
