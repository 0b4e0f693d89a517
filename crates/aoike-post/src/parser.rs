//! Post parser and Markdown renderer.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::frontmatter::{extract_front_matter, FrontMatter, FrontMatterError};

/// A parsed blog post.
#[derive(Debug, Clone)]
pub struct ParsedPost {
    /// Parsed front matter (if present)
    pub front_matter: Option<FrontMatter>,

    /// Markdown content (without front matter)
    pub content: String,

    /// Rendered HTML, headings carry `id` anchors
    pub html: String,

    /// Table of contents entries
    pub toc: Vec<TocEntry>,
}

impl ParsedPost {
    /// Title from front matter, falling back to the first level-1 heading.
    pub fn title(&self) -> Option<&str> {
        self.front_matter
            .as_ref()
            .and_then(|fm| fm.title.as_deref())
            .or_else(|| {
                self.toc
                    .iter()
                    .find(|entry| entry.level == 1)
                    .map(|entry| entry.title.as_str())
            })
    }

    pub fn is_draft(&self) -> bool {
        self.front_matter.as_ref().is_some_and(|fm| fm.draft)
    }

    pub fn date(&self) -> Option<&str> {
        self.front_matter.as_ref().and_then(|fm| fm.date.as_deref())
    }

    /// The front matter date as a timestamp, if it parses.
    pub fn published(&self) -> Option<NaiveDateTime> {
        self.date().and_then(parse_date)
    }
}

/// Parse a front matter date.
///
/// Accepts RFC 3339 and `YYYY-MM-DD` with an optional `HH:MM[:SS]` time.
/// Month and day need not be zero-padded.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Errors that can occur when parsing a post.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
}

/// Parse a Markdown post.
///
/// Extracts front matter, renders HTML and generates a table of contents.
pub fn parse_post(source: &str) -> Result<ParsedPost, ParseError> {
    let (front_matter, content) = extract_front_matter(source)?;

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;

    let mut events: Vec<Event> = Parser::new_ext(content, options).collect();

    // (start event index, level, text) per heading
    let mut headings: Vec<(usize, u8, String)> = Vec::new();
    let mut current_heading: Option<(usize, u8, String)> = None;

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some((index, heading_level(*level), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, ref mut title)) = current_heading {
                    title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = current_heading.take() {
                    headings.push(heading);
                }
            }
            _ => {}
        }
    }

    let mut toc = Vec::with_capacity(headings.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (start, level, title) in headings {
        let id = match &mut events[start] {
            // Explicit `{#id}` attributes win
            Event::Start(Tag::Heading {
                id: Some(existing), ..
            }) => existing.to_string(),
            Event::Start(Tag::Heading { id: anchor, .. }) => {
                let id = unique_id(&mut seen, slugify(&title));
                *anchor = Some(CowStr::from(id.clone()));
                id
            }
            _ => continue,
        };

        toc.push(TocEntry { title, id, level });
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    Ok(ParsedPost {
        front_matter,
        content: content.to_string(),
        html: html_output,
        toc,
    })
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn unique_id(seen: &mut HashMap<String, usize>, base: String) -> String {
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}-{}", base, *count - 1)
    }
}

/// Convert a heading to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_complete_post() {
        let source = r#"---
title: First Post
date: 2024-05-01
---

# Hello

Some **bold** text.

## Details

| a | b |
|---|---|
| 1 | 2 |
"#;

        let post = parse_post(source).unwrap();

        assert_eq!(post.title(), Some("First Post"));
        assert_eq!(post.date(), Some("2024-05-01"));
        assert!(!post.is_draft());

        assert_eq!(post.toc.len(), 2);
        assert_eq!(post.toc[0].id, "hello");
        assert_eq!(post.toc[1].level, 2);

        assert!(post.html.contains(r#"<h1 id="hello">Hello</h1>"#));
        assert!(post.html.contains("<strong>bold</strong>"));
        assert!(post.html.contains("<table>"));
    }

    #[test]
    fn falls_back_to_first_heading_for_title() {
        let post = parse_post("## Intro\n\n# Real Title\n").unwrap();

        assert!(post.front_matter.is_none());
        assert_eq!(post.title(), Some("Real Title"));
    }

    #[test]
    fn deduplicates_heading_ids() {
        let post = parse_post("## Notes\n\n## Notes\n\n## Notes\n").unwrap();

        let ids: Vec<_> = post.toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["notes", "notes-1", "notes-2"]);
    }

    #[test]
    fn reports_draft_posts() {
        let post = parse_post("---\ndraft: true\n---\nwip").unwrap();

        assert!(post.is_draft());
        assert_eq!(post.title(), None);
    }

    #[test]
    fn propagates_front_matter_errors() {
        let result = parse_post("---\ntitle: x\n");

        assert!(matches!(
            result,
            Err(ParseError::FrontMatter(FrontMatterError::Unclosed))
        ));
    }

    #[test]
    fn parses_unpadded_and_timed_dates() {
        let september = parse_date("2024-9-1").unwrap();
        let october = parse_date("2024-10-01").unwrap();

        assert!(october > september);
        assert_eq!(
            parse_date("2024-10-01 08:30").unwrap(),
            october + chrono::Duration::minutes(510)
        );
        assert!(parse_date("2024-10-01T00:00:00Z").is_some());
        assert_eq!(parse_date("someday"), None);
    }

    #[test]
    fn slugify_works() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("API Reference"), "api-reference");
        assert_eq!(slugify("Button (Primary)"), "button-primary");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
