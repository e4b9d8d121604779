//! Core record types.

use std::{collections::BTreeMap, sync::LazyLock};

use clap::ValueEnum;
use regex::Regex;
use serde_json::Value;

use super::{Block, Document, FrontMatter, Header, ParseContext, RecordError, extract_fields, extract_paired_fields};

/// Jira caps summaries and plain text fields at this many characters.
pub const SUMMARY_LIMIT: usize = 255;

/// What a record file describes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, ValueEnum, derive_more::Display)]
pub enum RecordKind {
	Epic,
	Feature,
	/// A User Story paired with its Subtask.
	Story,
}

impl RecordKind {
	/// Guess the kind from front matter: explicit `issue_type`, then a `user_story:` section,
	/// then a top-level `parent_key`, else Epic.
	pub fn detect(fm: &FrontMatter) -> Self {
		match fm.root().scalar("issue_type").to_ascii_lowercase().as_str() {
			"epic" => return Self::Epic,
			"feature" => return Self::Feature,
			"story" | "user story" => return Self::Story,
			_ => {}
		}
		if fm.has_section(Part::UserStory.section_key()) {
			Self::Story
		} else if fm.root().contains("parent_key") {
			Self::Feature
		} else {
			Self::Epic
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, derive_more::Display)]
pub enum EntityKind {
	Epic,
	Feature,
	Story,
	Subtask,
}

/// The two halves of a Story record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Part {
	UserStory,
	Subtask,
}

impl Part {
	pub fn from_heading(content: &str) -> Option<Self> {
		match content.trim() {
			"User Story" => Some(Self::UserStory),
			"Subtask" => Some(Self::Subtask),
			_ => None,
		}
	}

	/// Level-1 heading that opens this part.
	pub fn heading(self) -> &'static str {
		match self {
			Self::UserStory => "User Story",
			Self::Subtask => "Subtask",
		}
	}

	/// Front matter section holding this part's metadata.
	pub fn section_key(self) -> &'static str {
		match self {
			Self::UserStory => "user_story",
			Self::Subtask => "subtask",
		}
	}
}

impl EntityKind {
	/// Where this entity lives inside a Story record.
	pub fn part(self) -> Option<Part> {
		match self {
			Self::Story => Some(Part::UserStory),
			Self::Subtask => Some(Part::Subtask),
			Self::Epic | Self::Feature => None,
		}
	}
}

impl From<RecordKind> for EntityKind {
	fn from(kind: RecordKind) -> Self {
		match kind {
			RecordKind::Epic => Self::Epic,
			RecordKind::Feature => Self::Feature,
			RecordKind::Story => Self::Story,
		}
	}
}

/// Metadata fields shared by every entity, raw as written in front matter.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EntityMeta {
	pub key: String,
	pub parent_key: String,
	pub status: String,
	pub team_id: String,
	pub sprint_id: String,
	pub pm_owner: String,
	pub assignee: String,
	pub story_points: String,
	pub labels: Vec<String>,
}

impl EntityMeta {
	pub fn from_block(block: &Block) -> Self {
		Self {
			key: block.scalar("jira_key"),
			parent_key: block.scalar("parent_key"),
			status: block.scalar("status"),
			team_id: block.scalar("team_id"),
			sprint_id: block.scalar("sprint_id"),
			pm_owner: block.scalar("pm_owner"),
			assignee: block.scalar("assignee"),
			story_points: block.scalar("story_points"),
			labels: block.list("labels"),
		}
	}
}

/// One Jira issue as described locally.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
	pub kind: EntityKind,
	pub meta: EntityMeta,
	/// Summary taken from the body, if the body has one.
	pub summary: Option<String>,
	/// ADF payloads by field id.
	pub rich_text: BTreeMap<String, Value>,
	/// Epic only.
	pub problem_statement: Option<String>,
}

impl Entity {
	pub fn is_draft(&self) -> bool {
		self.meta.key.is_empty()
	}
}

/// A parsed record file.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
	pub kind: RecordKind,
	pub primary: Entity,
	/// Story records only, when the `subtask:` section exists.
	pub subtask: Option<Entity>,
}

impl Record {
	/// Parse and validate a record. `kind` overrides auto-detection.
	pub fn parse(content: &str, ctx: &ParseContext, kind: Option<RecordKind>) -> Result<Self, RecordError> {
		let fm = FrontMatter::parse(content, ctx)?;
		let kind = kind.unwrap_or_else(|| RecordKind::detect(&fm));
		let doc = Document::parse(content);

		let record = match kind {
			RecordKind::Epic | RecordKind::Feature => {
				let entity_kind = EntityKind::from(kind);
				let summary = doc.section_body(None, "Summary").map(|body| join_lines(&body)).filter(|s| !s.is_empty());
				let problem_statement = (entity_kind == EntityKind::Epic).then(|| problem_statement(&doc)).flatten();
				Self {
					kind,
					primary: Entity {
						kind: entity_kind,
						meta: EntityMeta::from_block(fm.root()),
						summary,
						rich_text: extract_fields(content, ctx)?,
						problem_statement,
					},
					subtask: None,
				}
			}
			RecordKind::Story => {
				let story_meta = EntityMeta::from_block(fm.section(Part::UserStory.section_key())?);
				let (story_fields, subtask_fields) = extract_paired_fields(content, ctx)?;
				let subtask = if fm.has_section(Part::Subtask.section_key()) {
					Some(Entity {
						kind: EntityKind::Subtask,
						meta: EntityMeta::from_block(fm.section(Part::Subtask.section_key())?),
						summary: acceptance_summary(&doc, Part::Subtask),
						rich_text: subtask_fields,
						problem_statement: None,
					})
				} else {
					None
				};
				Self {
					kind,
					primary: Entity {
						kind: EntityKind::Story,
						meta: story_meta,
						summary: acceptance_summary(&doc, Part::UserStory),
						rich_text: story_fields,
						problem_statement: None,
					},
					subtask,
				}
			}
		};

		record.validate()?;
		Ok(record)
	}

	fn validate(&self) -> Result<(), RecordError> {
		if self.kind != RecordKind::Story {
			return Ok(());
		}
		let story = &self.primary.meta;
		if story.parent_key.is_empty() {
			return Err(RecordError::validation("user_story.parent_key is required (Feature key)"));
		}
		if let Some(subtask) = &self.subtask
			&& !subtask.meta.key.is_empty()
			&& subtask.meta.parent_key != story.key
		{
			return Err(RecordError::validation(format!(
				"subtask.parent_key ({:?}) must equal user_story.jira_key ({:?})",
				subtask.meta.parent_key, story.key
			)));
		}
		Ok(())
	}

	pub fn entities(&self) -> impl Iterator<Item = &Entity> {
		std::iter::once(&self.primary).chain(self.subtask.as_ref())
	}
}

/// Non-empty lines joined by spaces. Subheadings contribute their text.
fn join_lines(body: &str) -> String {
	body.lines()
		.map(|line| Header::decode(line).map(|h| h.content).unwrap_or_else(|| line.trim().to_string()))
		.filter(|l| !l.is_empty())
		.collect::<Vec<_>>()
		.join(" ")
}

/// Cut to `limit` characters.
pub fn truncate_chars(s: &str, limit: usize) -> String {
	s.chars().take(limit).collect()
}

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("static regex"));
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("static regex"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("static regex"));
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[-*+]\s+").expect("static regex"));
static LAZY_BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex"));

/// First meaningful line of `## Acceptance Criteria` inside the part, markup stripped.
fn acceptance_summary(doc: &Document, part: Part) -> Option<String> {
	let body = doc.section_body(Some(part.heading()), "Acceptance Criteria")?;
	body.lines()
		.map(str::trim)
		.take_while(|line| !line.starts_with("<details>"))
		.filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('>') && !line.starts_with('<'))
		.map(|line| {
			let line = BOLD_RE.replace_all(line, "$1");
			let line = ITALIC_RE.replace_all(&line, "$1");
			CODE_RE.replace_all(&line, "$1").trim().to_string()
		})
		.find(|line| !line.is_empty())
		.map(|line| truncate_chars(&line, SUMMARY_LIMIT))
}

/// `## Problem Statement`, else the start of `## Business Context` as plain text.
fn problem_statement(doc: &Document) -> Option<String> {
	if let Some(body) = doc.section_body(None, "Problem Statement") {
		let body = body.trim();
		return (!body.is_empty()).then(|| body.to_string());
	}
	let context = doc.section_body(None, "Business Context")?;
	let plain = BULLET_RE.replace_all(context.trim(), "");
	let plain = LAZY_BOLD_RE.replace_all(&plain, "$1");
	let plain = truncate_chars(&plain, SUMMARY_LIMIT);
	(!plain.trim().is_empty()).then_some(plain)
}
