//! Front matter extraction and parsing.

use serde::Deserialize;

/// Front matter of a blog post. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FrontMatter {
    /// Post title
    #[serde(default)]
    pub title: Option<String>,

    /// Publish date, kept verbatim (`2024-05-01`, `2024-05-01 10:00`)
    #[serde(default)]
    pub date: Option<String>,

    /// Short summary shown on the index page
    #[serde(default)]
    pub description: Option<String>,

    /// Drafts are served in dev but left out of builds
    #[serde(default)]
    pub draft: bool,

    /// Category for grouping; defaults to the post's directory
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Extract front matter from a post.
///
/// Returns the parsed front matter and the remaining content after the block.
/// The block must open on the first line with `---` and close with a line
/// starting with `---`.
pub fn extract_front_matter(
    source: &str,
) -> Result<(Option<FrontMatter>, &str), FrontMatterError> {
    let Some(after_open) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return Ok((None, source));
    };

    // Empty block: "---\n---\n"
    let (yaml, rest) = if let Some(rest) = after_open.strip_prefix("---") {
        ("", rest)
    } else {
        let Some(close_pos) = after_open.find("\n---") else {
            return Err(FrontMatterError::Unclosed);
        };
        (&after_open[..close_pos], &after_open[close_pos + 4..])
    };

    // Drop the remainder of the closing fence line.
    let remaining = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => "",
    };

    if yaml.trim().is_empty() {
        return Ok((Some(FrontMatter::default()), remaining));
    }

    let front_matter: FrontMatter =
        serde_yaml::from_str(yaml).map_err(|e| FrontMatterError::InvalidYaml(e.to_string()))?;

    Ok((Some(front_matter), remaining))
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("Unclosed front matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_valid_front_matter() {
        let source = r#"---
title: Hello Aoike
date: 2024-05-01
tags: [rust, blog]
---

# Hello
"#;

        let (fm, content) = extract_front_matter(source).unwrap();
        let fm = fm.unwrap();

        assert_eq!(fm.title.as_deref(), Some("Hello Aoike"));
        assert_eq!(fm.date.as_deref(), Some("2024-05-01"));
        assert_eq!(fm.tags, vec!["rust".to_string(), "blog".to_string()]);
        assert!(!fm.draft);
        assert_eq!(content, "\n# Hello\n");
    }

    #[test]
    fn handles_no_front_matter() {
        let source = "# Just Markdown\n\n---\nnot a fence here";

        let (fm, content) = extract_front_matter(source).unwrap();

        assert!(fm.is_none());
        assert_eq!(content, source);
    }

    #[test]
    fn handles_empty_block() {
        let (fm, content) = extract_front_matter("---\n---\nbody").unwrap();

        assert_eq!(fm, Some(FrontMatter::default()));
        assert_eq!(content, "body");
    }

    #[test]
    fn errors_on_unclosed_front_matter() {
        let result = extract_front_matter("---\ntitle: Test\n# No closing");

        assert!(matches!(result, Err(FrontMatterError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = extract_front_matter("---\ntitle: [invalid yaml\n---\n");

        assert!(matches!(result, Err(FrontMatterError::InvalidYaml(_))));
    }
}
