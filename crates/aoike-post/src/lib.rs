//! Blog post parsing for aoike.
//!
//! Splits YAML front matter off a Markdown post, renders the body to HTML and
//! collects a table of contents from its headings.

pub mod frontmatter;
pub mod parser;

pub use frontmatter::{extract_front_matter, FrontMatter, FrontMatterError};
pub use parser::{parse_date, parse_post, slugify, ParseError, ParsedPost, TocEntry};
