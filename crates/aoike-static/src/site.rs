//! Source discovery and blog page rendering.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use aoike_plugin::{ResolvedConfig, CONFIG_FILE};
use aoike_post::{parse_post, ParsedPost};

use crate::builder::BuildError;
use crate::templates::{
    CategoriesContext, IndexContext, PostContext, PostGroup, PostLink, TemplateEngine, TocEntry,
};

/// Category for posts at the project root with no `category` key.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Directory names never treated as sources.
const IGNORED_DIRS: &[&str] = &["node_modules", "target"];

/// A Markdown post found in the project.
#[derive(Debug, Clone)]
pub struct Post {
    /// Source file path
    pub source_path: PathBuf,

    /// Path relative to the project root
    pub relative_path: PathBuf,

    pub parsed: ParsedPost,
}

impl Post {
    /// Read and parse a post.
    pub fn load(root: &Path, source_path: &Path) -> Result<Self, BuildError> {
        let source = fs::read_to_string(source_path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", source_path.display(), e)))?;

        let parsed = parse_post(&source).map_err(|e| BuildError::ParseError {
            path: source_path.display().to_string(),
            message: e.to_string(),
        })?;

        let relative_path = source_path
            .strip_prefix(root)
            .unwrap_or(source_path)
            .to_path_buf();

        Ok(Self {
            source_path: source_path.to_path_buf(),
            relative_path,
            parsed,
        })
    }

    /// Title from front matter or first heading, falling back to the file stem.
    pub fn title(&self) -> String {
        self.parsed
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.relative_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Untitled")
                    .to_string()
            })
    }

    /// Output path of the rendered page, relative to the output directory.
    pub fn page_path(&self) -> PathBuf {
        self.relative_path.with_extension("html")
    }

    /// Public URL of the rendered page, with each path segment percent-encoded.
    pub fn url(&self, base: &str) -> String {
        let encoded: Vec<_> = to_url_path(&self.page_path())
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!("{}{}", base, encoded.join("/"))
    }

    /// Front matter category, else the name of the directory holding the post.
    pub fn category(&self) -> String {
        self.parsed
            .front_matter
            .as_ref()
            .and_then(|fm| fm.category.clone())
            .or_else(|| {
                self.relative_path
                    .parent()
                    .and_then(|dir| dir.file_name())
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }

    pub fn tags(&self) -> &[String] {
        self.parsed
            .front_matter
            .as_ref()
            .map(|fm| fm.tags.as_slice())
            .unwrap_or_default()
    }

    fn link(&self, base: &str) -> PostLink {
        let fm = self.parsed.front_matter.as_ref();
        PostLink {
            title: self.title(),
            url: self.url(base),
            date: fm.and_then(|f| f.date.clone()),
            description: fm.and_then(|f| f.description.clone()),
            draft: self.parsed.is_draft(),
        }
    }
}

/// Join path components with `/` regardless of platform.
pub fn to_url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Find all source files under `root`.
///
/// Skips `skip` (usually the output directory), names starting with `_` or
/// `.`, dependency directories, and the config file at the root.
pub fn discover_files(root: &Path, skip: &[&Path]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if skip.iter().any(|s| entry.path() == *s) {
                return false;
            }

            let name = entry.file_name().to_str().unwrap_or("");
            if name.starts_with('_') || name.starts_with('.') {
                return false;
            }
            if entry.file_type().is_dir() && IGNORED_DIRS.contains(&name) {
                return false;
            }
            !(entry.depth() == 1 && name == CONFIG_FILE)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}

/// Load every `.md` file in `files` as a post.
///
/// Sorted newest first by parsed date, then by title. Posts without a
/// parseable date come last.
pub fn collect_posts(
    root: &Path,
    files: &[PathBuf],
    include_drafts: bool,
) -> Result<Vec<Post>, BuildError> {
    let mut posts = Vec::new();

    for path in files {
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let post = Post::load(root, path)?;
        if post.parsed.is_draft() && !include_drafts {
            tracing::debug!("Skipping draft {}", path.display());
            continue;
        }
        posts.push(post);
    }

    posts.sort_by(|a, b| match (a.parsed.published(), b.parsed.published()) {
        (Some(da), Some(db)) => db.cmp(&da).then_with(|| a.title().cmp(&b.title())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title().cmp(&b.title()),
    });

    Ok(posts)
}

/// Group posts by category, keeping the order of `posts` within each group.
pub fn group_by_category(posts: &[Post]) -> BTreeMap<String, Vec<&Post>> {
    let mut groups: BTreeMap<String, Vec<&Post>> = BTreeMap::new();
    for post in posts {
        groups.entry(post.category()).or_default().push(post);
    }
    groups
}

/// Group posts by tag. A post appears once under each of its tags.
pub fn group_by_tag(posts: &[Post]) -> BTreeMap<String, Vec<&Post>> {
    let mut groups: BTreeMap<String, Vec<&Post>> = BTreeMap::new();
    for post in posts {
        for tag in post.tags() {
            let group = groups.entry(tag.clone()).or_default();
            if !group.iter().any(|p| std::ptr::eq(*p, post)) {
                group.push(post);
            }
        }
    }
    groups
}

/// Stylesheets linked from generated pages: `main.css` of each alias directory.
pub fn theme_styles(config: &ResolvedConfig) -> Vec<String> {
    config
        .aliases
        .iter()
        .filter(|alias| alias.replacement.join("main.css").is_file())
        .map(|alias| format!("{}{}/main.css", config.base, alias.find))
        .collect()
}

/// Render a post page.
pub fn render_post_page(
    templates: &TemplateEngine,
    config: &ResolvedConfig,
    post: &Post,
) -> Result<String, BuildError> {
    let front_matter = post.parsed.front_matter.clone().unwrap_or_default();

    let context = PostContext {
        title: post.title(),
        site_title: config.title.clone(),
        content: post.parsed.html.clone(),
        date: front_matter.date,
        tags: front_matter.tags,
        toc: post
            .parsed
            .toc
            .iter()
            .map(|e| TocEntry {
                title: e.title.clone(),
                id: e.id.clone(),
                level: e.level,
            })
            .collect(),
        base_url: config.base.clone(),
        styles: theme_styles(config),
    };

    templates
        .render_post(&context)
        .map_err(|e| BuildError::TemplateError(e.to_string()))
}

/// Render the blog index listing `posts` in order.
pub fn render_index_page(
    templates: &TemplateEngine,
    config: &ResolvedConfig,
    posts: &[Post],
) -> Result<String, BuildError> {
    let context = IndexContext {
        site_title: config.title.clone(),
        posts: posts.iter().map(|post| post.link(&config.base)).collect(),
        base_url: config.base.clone(),
        styles: theme_styles(config),
    };

    templates
        .render_index(&context)
        .map_err(|e| BuildError::TemplateError(e.to_string()))
}

/// Render the page listing posts by category and by tag.
pub fn render_categories_page(
    templates: &TemplateEngine,
    config: &ResolvedConfig,
    posts: &[Post],
) -> Result<String, BuildError> {
    let to_groups = |groups: BTreeMap<String, Vec<&Post>>| -> Vec<PostGroup> {
        groups
            .into_iter()
            .map(|(name, posts)| PostGroup {
                name,
                posts: posts.iter().map(|post| post.link(&config.base)).collect(),
            })
            .collect()
    };

    let context = CategoriesContext {
        site_title: config.title.clone(),
        categories: to_groups(group_by_category(posts)),
        tags: to_groups(group_by_tag(posts)),
        base_url: config.base.clone(),
        styles: theme_styles(config),
    };

    templates
        .render_categories(&context)
        .map_err(|e| BuildError::TemplateError(e.to_string()))
}
