//! Extraction of ADF payloads embedded in a record body.
//!
//! A block looks like:
//! ```text
//! <details>
//! <summary>ADF Version (customfield_10256)</summary>
//!
//! ```json
//! { "type": "doc", ... }
//! ```
//! </details>
//! ```

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde_json::Value;

use super::{Header, ParseContext, Part, RecordError};

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ADF Version\s*\(([A-Za-z0-9_]+)\)").expect("static regex"));

/// One embedded payload.
#[derive(Clone, Debug, PartialEq)]
pub struct RichTextBlock {
	pub field_id: String,
	pub doc: Value,
	/// 1-indexed line of the marker.
	pub line: usize,
	/// Part of a Story record the block sits in, if any.
	pub part: Option<Part>,
}

/// Field id named by a marker line.
pub(super) fn marker_field_id(line: &str) -> Option<&str> {
	MARKER_RE.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// All blocks in document order.
///
/// A marker with no ```` ```json ```` / ```` ``` ```` pair after it is skipped, as are empty payloads.
pub fn extract_blocks(content: &str, ctx: &ParseContext) -> Result<Vec<RichTextBlock>, RecordError> {
	let lines: Vec<&str> = content.split('\n').collect();
	let mut blocks = Vec::new();
	let mut part = None;
	let mut i = 0;

	while i < lines.len() {
		// Only the part headings change the owner; other level-1 headings belong to the current part.
		if let Some(header) = Header::decode(lines[i])
			&& header.level == 1
			&& let Some(heading_part) = Part::from_heading(&header.content)
		{
			part = Some(heading_part);
			i += 1;
			continue;
		}

		let Some(field_id) = marker_field_id(lines[i]) else {
			i += 1;
			continue;
		};
		let Some(open) = (i + 1..lines.len()).find(|&j| lines[j].trim() == "```json") else {
			i += 1;
			continue;
		};
		let Some(close) = (open + 1..lines.len()).find(|&k| lines[k].trim() == "```") else {
			i += 1;
			continue;
		};

		let raw = lines[open + 1..close].join("\n");
		let raw = raw.trim();
		if !raw.is_empty() {
			let doc: Value = serde_json::from_str(raw).map_err(|e| RecordError::InvalidRichText {
				field_id: field_id.to_string(),
				line: open + 1,
				message: e.to_string(),
				src: ctx.named_source(),
				span: ctx.lines_span(open + 2, close),
			})?;
			blocks.push(RichTextBlock {
				field_id: field_id.to_string(),
				doc,
				line: i + 1,
				part,
			});
		}
		i = close + 1;
	}

	Ok(blocks)
}

fn collect<'a>(blocks: impl Iterator<Item = &'a RichTextBlock>) -> BTreeMap<String, Value> {
	let mut fields = BTreeMap::new();
	for block in blocks {
		if fields.insert(block.field_id.clone(), block.doc.clone()).is_some() {
			tracing::warn!(field_id = %block.field_id, line = block.line, "duplicate ADF block, keeping the later one");
		}
	}
	fields
}

/// Field id → payload for a single-entity record. Later duplicates win.
pub fn extract_fields(content: &str, ctx: &ParseContext) -> Result<BTreeMap<String, Value>, RecordError> {
	let blocks = extract_blocks(content, ctx)?;
	Ok(collect(blocks.iter()))
}

/// Story and Subtask payloads of a Story record. Blocks outside both parts are dropped.
pub fn extract_paired_fields(content: &str, ctx: &ParseContext) -> Result<(BTreeMap<String, Value>, BTreeMap<String, Value>), RecordError> {
	let blocks = extract_blocks(content, ctx)?;
	let story = collect(blocks.iter().filter(|b| b.part == Some(Part::UserStory)));
	let subtask = collect(blocks.iter().filter(|b| b.part == Some(Part::Subtask)));
	Ok((story, subtask))
}

/// Render the `<details>` block for a payload, one entry per line.
pub fn render_block(field_id: &str, doc: &Value) -> Vec<String> {
	let json = serde_json::to_string_pretty(doc).unwrap_or_else(|_| doc.to_string());
	let mut lines = vec!["<details>".to_string(), format!("<summary>ADF Version ({field_id})</summary>"), String::new(), "```json".to_string()];
	lines.extend(json.lines().map(str::to_string));
	lines.push("```".to_string());
	lines.push("</details>".to_string());
	lines
}
