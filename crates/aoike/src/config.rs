//! The fixed build configuration used by every command.

use std::path::PathBuf;
use std::sync::Arc;

use aoike_plugin::{AoikePlugin, BuildConfiguration};

/// Project root, relative to the working directory.
pub const PROJECT_ROOT: &str = ".";

/// Alias prefix for the bundled theme.
pub const THEME_ALIAS: &str = "@";

/// Bundled theme directory, shipped next to this crate's manifest.
pub const THEME_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/theme");

/// Configuration handed to the host for `dev` and `build`.
pub fn build_configuration() -> BuildConfiguration {
    BuildConfiguration {
        project_root: PathBuf::from(PROJECT_ROOT),
        aliases: vec![(THEME_ALIAS.to_string(), PathBuf::from(THEME_DIR))],
        plugins: vec![Arc::new(AoikePlugin::new())],
        config_file_disabled: true,
    }
}
