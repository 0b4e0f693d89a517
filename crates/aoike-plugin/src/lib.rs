//! Plugin hooks and configuration for the aoike host.
//!
//! A [`BuildConfiguration`] names the project root, path aliases and an ordered
//! plugin list. [`resolve_config`] turns it into a [`ResolvedConfig`] plus a
//! [`PluginContainer`] that the dev server and the static builder drive.

pub mod config;
pub mod container;
pub mod markdown;
pub mod traits;

pub use config::{
    resolve_config, Alias, BuildConfiguration, ConfigError, ResolvedConfig, ServerOptions,
    CONFIG_FILE,
};
pub use container::PluginContainer;
pub use markdown::AoikePlugin;
pub use traits::{Plugin, PluginError, ServerContext, TransformResult};
