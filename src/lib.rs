//! Two-way sync between local Markdown planning records and Jira issues.
//!
//! A record is a Markdown file with a `---` front matter block holding the
//! issue metadata, and `<details>` blocks holding Atlassian Document Format
//! payloads for rich-text fields. [`sync`] creates, pushes and pulls them.

pub mod config;
pub mod fields;
pub mod jira;
pub mod mock_jira;
pub mod record;
pub mod sync;

pub use fields::{FieldSet, FieldValue};
pub use jira::{JiraClient, JiraError, RealJiraClient};
pub use mock_jira::MockJiraClient;
pub use record::{Document, Entity, EntityKind, EntityMeta, FrontMatter, ParseContext, Record, RecordError, RecordKind, normalize_marks};

/// A Markdown heading: `# Content`, `## Content`, etc.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
	pub level: usize,
	pub content: String,
}

impl Header {
	/// Create a new header with the given level and content.
	/// Level must be >= 1.
	pub fn new(level: usize, content: impl Into<String>) -> Self {
		debug_assert!(level >= 1, "Header level must be >= 1");
		Self {
			level: level.max(1),
			content: content.into(),
		}
	}

	/// Decode a header from a line. The `#` run must start at the first column.
	/// Returns None if the line is not a valid header.
	pub fn decode(s: &str) -> Option<Self> {
		let trimmed = s.trim_end();
		if !trimmed.starts_with('#') {
			return None;
		}
		let level = trimmed.chars().take_while(|ch| *ch == '#').count();
		// Valid header must have space after the # characters
		let rest = &trimmed[level..];
		let stripped = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('\t'))?;
		let content = stripped.trim();
		if content.is_empty() {
			return None;
		}
		Some(Self {
			level,
			content: content.to_string(),
		})
	}

	pub fn encode(&self) -> String {
		format!("{} {}", "#".repeat(self.level), self.content)
	}
}
