//! Template engine for rendering blog pages.

use minijinja::{context, Environment};

/// A table of contents entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// A post listed on the index page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostLink {
    pub title: String,
    pub url: String,
    pub date: Option<String>,
    pub description: Option<String>,
    pub draft: bool,
}

/// Context for rendering a post page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostContext {
    /// Post title
    pub title: String,
    /// Site title
    pub site_title: String,
    /// Rendered content HTML
    pub content: String,
    pub date: Option<String>,
    pub tags: Vec<String>,
    /// Table of contents
    pub toc: Vec<TocEntry>,
    /// Base URL
    pub base_url: String,
    /// Stylesheet URLs
    pub styles: Vec<String>,
}

/// Context for rendering the index page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexContext {
    pub site_title: String,
    pub posts: Vec<PostLink>,
    pub base_url: String,
    pub styles: Vec<String>,
}

/// A named group of posts on the categories page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostGroup {
    pub name: String,
    pub posts: Vec<PostLink>,
}

/// Context for rendering the categories page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoriesContext {
    pub site_title: String,
    /// Sorted by name
    pub categories: Vec<PostGroup>,
    /// Sorted by name
    pub tags: Vec<PostGroup>,
    pub base_url: String,
    pub styles: Vec<String>,
}

/// Template engine using minijinja.
///
/// Templates auto-escape, which would also escape `/`. URLs are built from
/// percent-encoded path segments and marked `safe` in attributes.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with the built-in templates.
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_template("base.html", BASE_TEMPLATE)
            .expect("Failed to add base template");
        env.add_template("post.html", POST_TEMPLATE)
            .expect("Failed to add post template");
        env.add_template("index.html", INDEX_TEMPLATE)
            .expect("Failed to add index template");
        env.add_template("categories.html", CATEGORIES_TEMPLATE)
            .expect("Failed to add categories template");

        Self { env }
    }

    /// Render a post page.
    pub fn render_post(&self, ctx: &PostContext) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("post.html")?;

        tmpl.render(context! {
            title => &ctx.title,
            site_title => &ctx.site_title,
            content => &ctx.content,
            date => &ctx.date,
            tags => &ctx.tags,
            toc => &ctx.toc,
            base_url => &ctx.base_url,
            styles => &ctx.styles,
        })
    }

    /// Render the blog index.
    pub fn render_index(&self, ctx: &IndexContext) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("index.html")?;

        tmpl.render(context! {
            title => &ctx.site_title,
            site_title => &ctx.site_title,
            posts => &ctx.posts,
            base_url => &ctx.base_url,
            styles => &ctx.styles,
        })
    }

    /// Render posts grouped by category and by tag.
    pub fn render_categories(&self, ctx: &CategoriesContext) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("categories.html")?;

        tmpl.render(context! {
            title => "Categories",
            site_title => &ctx.site_title,
            categories => &ctx.categories,
            tags => &ctx.tags,
            base_url => &ctx.base_url,
            styles => &ctx.styles,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% if title != site_title %}{{ title }} - {% endif %}{{ site_title }}</title>
  {% for style in styles %}<link rel="stylesheet" href="{{ style | safe }}">
  {% endfor %}
</head>
<body>
  <header class="site-header">
    <a href="{{ base_url | safe }}" class="site-title">{{ site_title }}</a>
  </header>
  <main class="main">
    {% block content %}{% endblock %}
  </main>
</body>
</html>"##;

const POST_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<article class="post">
  <header class="post-header">
    <h1 class="post-title">{{ title }}</h1>
    {% if date %}<time class="post-date">{{ date }}</time>{% endif %}
    {% if tags %}
    <ul class="post-tags">
    {% for tag in tags %}<li>{{ tag }}</li>{% endfor %}
    </ul>
    {% endif %}
  </header>
  <div class="content">
    {{ content | safe }}
  </div>
</article>

{% if toc %}
<aside class="toc">
  <h2>On this page</h2>
  <ul>
  {% for entry in toc %}
    <li class="toc-level-{{ entry.level }}">
      <a href="#{{ entry.id }}">{{ entry.title }}</a>
    </li>
  {% endfor %}
  </ul>
</aside>
{% endif %}
{% endblock %}"##;

const INDEX_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<ul class="post-list">
{% for post in posts %}
  <li class="post-item{% if post.draft %} draft{% endif %}">
    <a href="{{ post.url | safe }}">{{ post.title }}</a>
    {% if post.date %}<time>{{ post.date }}</time>{% endif %}
    {% if post.description %}<p>{{ post.description }}</p>{% endif %}
  </li>
{% else %}
  <li class="empty">No posts yet.</li>
{% endfor %}
</ul>
{% endblock %}"##;

const CATEGORIES_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
{% macro group_list(groups, kind) %}
{% for group in groups %}
<section class="post-group {{ kind }}">
  <h2 id="{{ kind }}-{{ loop.index }}">{{ group.name }} <span class="count">{{ group.posts | length }}</span></h2>
  <ul class="post-list">
  {% for post in group.posts %}
    <li class="post-item{% if post.draft %} draft{% endif %}">
      <a href="{{ post.url | safe }}">{{ post.title }}</a>
      {% if post.date %}<time>{{ post.date }}</time>{% endif %}
    </li>
  {% endfor %}
  </ul>
</section>
{% endfor %}
{% endmacro %}
<h1>Categories</h1>
{{ group_list(categories, "category") }}
{% if tags %}
<h1>Tags</h1>
{{ group_list(tags, "tag") }}
{% endif %}
{% endblock %}"##;
