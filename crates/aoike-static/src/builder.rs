//! Static site builder.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use aoike_plugin::{PluginContainer, ResolvedConfig};

use crate::assets::AssetPipeline;
use crate::site::{
    collect_posts, discover_files, render_categories_page, render_index_page, render_post_page,
    to_url_path,
};
use crate::templates::TemplateEngine;

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of source modules emitted
    pub modules: usize,

    /// Number of modules a plugin rewrote
    pub transformed: usize,

    /// Number of post pages rendered
    pub pages: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read source: {0}")]
    ReadError(String),

    #[error("Failed to parse post: {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to transform module: {0}")]
    TransformError(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// One file to emit.
#[derive(Debug)]
struct Job {
    /// Absolute or root-relative source path
    source: PathBuf,

    /// Output path relative to the output directory
    output: PathBuf,

    /// Manifest key
    key: String,
}

/// Manifest entry written to `manifest.json`.
#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    file: String,
    transformed: bool,
}

/// Static site builder.
pub struct StaticBuilder {
    config: ResolvedConfig,
    plugins: Arc<PluginContainer>,
    templates: TemplateEngine,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: ResolvedConfig, plugins: Arc<PluginContainer>) -> Self {
        Self {
            config,
            plugins,
            templates: TemplateEngine::new(),
        }
    }

    /// Build the site into the output directory.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let out_dir = &self.config.out_dir;

        if !self.config.root.is_dir() {
            return Err(BuildError::ReadError(format!(
                "Project root not found: {}",
                self.config.root.display()
            )));
        }

        self.clean_output()?;

        let sources = discover_files(&self.config.root, &[out_dir.as_path()]);
        let jobs = self.plan_jobs(&sources);

        tracing::info!("Building {} modules into {}", jobs.len(), out_dir.display());

        let emitted: Vec<(String, ManifestEntry)> = jobs
            .par_iter()
            .map(|job| self.emit(job).map(|entry| (job.key.clone(), entry)))
            .collect::<Result<_, _>>()?;

        let transformed = emitted.iter().filter(|(_, e)| e.transformed).count();

        // Render post pages
        let posts = collect_posts(&self.config.root, &sources, false)?;
        for post in &posts {
            let html = render_post_page(&self.templates, &self.config, post)?;
            write_output(&out_dir.join(post.page_path()), html.as_bytes())?;
        }

        let index_path = out_dir.join("index.html");
        if !index_path.exists() {
            let html = render_index_page(&self.templates, &self.config, &posts)?;
            write_output(&index_path, html.as_bytes())?;
        }

        let categories_path = out_dir.join("categories.html");
        if !categories_path.exists() {
            let html = render_categories_page(&self.templates, &self.config, &posts)?;
            write_output(&categories_path, html.as_bytes())?;
        }

        self.write_manifest(emitted.iter().map(|(k, e)| (k.as_str(), e)))?;

        Ok(BuildResult {
            modules: emitted.len(),
            transformed,
            pages: posts.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: out_dir.clone(),
        })
    }

    /// Empty and recreate the output directory.
    fn clean_output(&self) -> Result<(), BuildError> {
        let out_dir = &self.config.out_dir;

        let same_as_root = match (out_dir.canonicalize(), self.config.root.canonicalize()) {
            (Ok(out), Ok(root)) => root.starts_with(&out),
            _ => false,
        };
        if same_as_root {
            return Err(BuildError::WriteError(format!(
                "Output directory {} contains the project root",
                out_dir.display()
            )));
        }

        if out_dir.exists() {
            tracing::debug!("Cleaning {}", out_dir.display());
            fs::remove_dir_all(out_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }
        fs::create_dir_all(out_dir).map_err(|e| BuildError::WriteError(e.to_string()))
    }

    /// Map root sources and alias directories to output jobs.
    fn plan_jobs(&self, sources: &[PathBuf]) -> Vec<Job> {
        let root = &self.config.root;
        let mut jobs: Vec<Job> = sources
            .iter()
            .map(|source| {
                let relative = source.strip_prefix(root).unwrap_or(source).to_path_buf();
                Job {
                    source: source.clone(),
                    key: to_url_path(&relative),
                    output: relative,
                }
            })
            .collect();

        for alias in &self.config.aliases {
            if !alias.replacement.is_dir() {
                tracing::warn!(
                    "Alias {} points to missing directory {}",
                    alias.find,
                    alias.replacement.display()
                );
                continue;
            }

            for source in discover_files(&alias.replacement, &[]) {
                let relative = source
                    .strip_prefix(&alias.replacement)
                    .unwrap_or(&source)
                    .to_path_buf();
                jobs.push(Job {
                    key: format!("{}/{}", alias.find, to_url_path(&relative)),
                    output: PathBuf::from(&alias.find).join(relative),
                    source,
                });
            }
        }

        jobs
    }

    /// Emit a single module.
    fn emit(&self, job: &Job) -> Result<ManifestEntry, BuildError> {
        let bytes = fs::read(&job.source)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", job.source.display(), e)))?;

        if let Ok(code) = std::str::from_utf8(&bytes) {
            let id = job.source.to_string_lossy();
            let result = self
                .plugins
                .transform(code, &id)
                .map_err(|e| BuildError::TransformError(e.to_string()))?;

            if let Some(result) = result {
                let output = module_output_path(&job.output);
                write_output(&self.config.out_dir.join(&output), result.code.as_bytes())?;
                return Ok(ManifestEntry {
                    file: to_url_path(&output),
                    transformed: true,
                });
            }

            if self.config.minify && job.source.extension().is_some_and(|e| e == "css") {
                let css = AssetPipeline::minify_css(code).unwrap_or_else(|e| {
                    tracing::warn!("{}: {}", job.source.display(), e);
                    code.to_string()
                });
                write_output(&self.config.out_dir.join(&job.output), css.as_bytes())?;
                return Ok(ManifestEntry {
                    file: to_url_path(&job.output),
                    transformed: false,
                });
            }
        }

        write_output(&self.config.out_dir.join(&job.output), &bytes)?;
        Ok(ManifestEntry {
            file: to_url_path(&job.output),
            transformed: false,
        })
    }

    fn write_manifest<'a>(
        &self,
        entries: impl Iterator<Item = (&'a str, &'a ManifestEntry)>,
    ) -> Result<(), BuildError> {
        let manifest: BTreeMap<&str, &ManifestEntry> = entries.collect();
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        write_output(&self.config.out_dir.join("manifest.json"), json.as_bytes())
    }
}

/// `posts/a.md` -> `posts/a.md.js`
fn module_output_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".js");
    PathBuf::from(name)
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
    }
    fs::write(path, contents)
        .map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))
}
