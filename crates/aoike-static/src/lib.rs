//! Static site builder for aoike blogs.
//!
//! Runs every source file through the plugin container, renders Markdown posts
//! to pages and writes the result to the output directory.

pub mod assets;
pub mod builder;
pub mod site;
pub mod templates;

pub use assets::AssetPipeline;
pub use builder::{BuildError, BuildResult, StaticBuilder};
pub use site::{
    collect_posts, discover_files, group_by_category, group_by_tag, render_categories_page,
    render_index_page, render_post_page, Post,
};
pub use templates::TemplateEngine;
