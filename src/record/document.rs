//! Rewritable view of a record file.
//!
//! The document is kept as lines: the front matter block, then the body split
//! into heading sections. Edits touch only the lines they target, so an
//! untouched document serializes back byte-identically. CRLF files keep their
//! line endings, edited lines included.

use std::ops::Range;

use serde_json::Value;

use super::{
	Header, Part,
	front_matter::{closing_marker, comment_suffix, indent_width, split_key},
	rich_text::{marker_field_id, render_block},
};

/// Body text of a freshly created rich-text section.
pub const PLACEHOLDER_TEXT: &str = "[To be populated from Jira]";

#[derive(Clone, Debug, Eq, PartialEq)]
struct FrontMatterLines {
	open: String,
	lines: Vec<String>,
	close: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Section {
	/// Parsed heading and the line it came from. `None` for the text before the first heading.
	heading: Option<(Header, String)>,
	lines: Vec<String>,
}

impl Section {
	fn new(level: usize, title: &str, lines: Vec<String>) -> Self {
		let header = Header::new(level, title);
		let raw = header.encode();
		Self { heading: Some((header, raw)), lines }
	}

	fn level(&self) -> Option<usize> {
		self.heading.as_ref().map(|(h, _)| h.level)
	}

	fn is(&self, level: usize, title: &str) -> bool {
		self.heading.as_ref().is_some_and(|(h, _)| h.level == level && h.content == title)
	}

	fn ends_with_blank(&self) -> bool {
		self.lines.last().is_some_and(|l| l.trim().is_empty())
	}
}

/// Where to create a section that does not exist yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Placement {
	/// First thing in the scope: right after the front matter, or after the part heading.
	Start,
	/// Right after the named level-2 section, else like [`Placement::Start`].
	After(&'static str),
	/// Before a `## References` section, else at the end of the scope.
	BeforeReferences,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Document {
	front_matter: Option<FrontMatterLines>,
	sections: Vec<Section>,
	trailing_newline: bool,
	line_ending: &'static str,
}

impl Document {
	pub fn parse(content: &str) -> Self {
		let trailing_newline = content.ends_with('\n');
		let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
		let mut lines: Vec<&str> = content.split('\n').collect();
		if trailing_newline {
			lines.pop();
		}
		if line_ending == "\r\n" {
			for line in &mut lines {
				*line = line.strip_suffix('\r').unwrap_or(*line);
			}
		}

		let (front_matter, body) = match closing_marker(&lines) {
			Ok(close) => (
				Some(FrontMatterLines {
					open: lines[0].to_string(),
					lines: lines[1..close].iter().map(|l| l.to_string()).collect(),
					close: lines[close].to_string(),
				}),
				&lines[close + 1..],
			),
			Err(()) => (None, &lines[..]),
		};

		let mut sections = vec![Section { heading: None, lines: Vec::new() }];
		let mut in_fence = false;
		for line in body {
			if line.trim_start().starts_with("```") {
				in_fence = !in_fence;
			}
			if !in_fence
				&& let Some(header) = Header::decode(line)
			{
				sections.push(Section {
					heading: Some((header, line.to_string())),
					lines: Vec::new(),
				});
				continue;
			}
			if let Some(current) = sections.last_mut() {
				current.lines.push(line.to_string());
			}
		}

		Self {
			front_matter,
			sections,
			trailing_newline,
			line_ending,
		}
	}

	pub fn has_front_matter(&self) -> bool {
		self.front_matter.is_some()
	}

	//==========================================================================
	// Front matter
	//==========================================================================

	/// Set `key: "value"` at the top level, or inside the `section:` block.
	/// Returns false if the document has no front matter.
	pub fn set_field(&mut self, section: Option<&str>, key: &str, value: &str) -> bool {
		self.set_raw_field(section, key, &quote_scalar(value))
	}

	/// Set `key: ["a", "b"]`.
	pub fn set_list_field(&mut self, section: Option<&str>, key: &str, values: &[String]) -> bool {
		let items: Vec<String> = values.iter().map(|v| quote_scalar(v)).collect();
		self.set_raw_field(section, key, &format!("[{}]", items.join(", ")))
	}

	fn set_raw_field(&mut self, section: Option<&str>, key: &str, rendered: &str) -> bool {
		let Some(fm) = self.front_matter.as_mut() else { return false };

		enum Target {
			Replace(usize),
			InsertAfterSection(usize),
			Missing,
		}

		let mut target = Target::Missing;
		let mut current: Option<&str> = None;
		let mut section_indent: Option<usize> = None;
		let mut section_prefix = String::from("  ");
		for (idx, line) in fm.lines.iter().enumerate() {
			let trimmed = line.trim();
			if trimmed.is_empty() || trimmed.starts_with('#') {
				continue;
			}
			let Some((k, _)) = split_key(line) else { continue };
			let indent = indent_width(line);

			if indent == 0 {
				current = Some(k);
				if section.is_none() && k == key {
					target = Target::Replace(idx);
					break;
				}
				if section == Some(k) {
					target = Target::InsertAfterSection(idx);
				}
				continue;
			}

			if section.is_none() || current != section {
				continue;
			}
			let expected = *section_indent.get_or_insert_with(|| {
				section_prefix = line[..indent].to_string();
				indent
			});
			if indent == expected && k == key {
				target = Target::Replace(idx);
				break;
			}
		}

		match target {
			Target::Replace(idx) => {
				let line = &fm.lines[idx];
				let indent = indent_width(line);
				let raw = line.split_once(':').map(|(_, raw)| raw).unwrap_or("");
				let comment = comment_suffix(raw);
				let comment = if comment.starts_with('#') { format!(" {comment}") } else { comment.to_string() };
				fm.lines[idx] = format!("{}{key}: {rendered}{comment}", &line[..indent]);
			}
			Target::InsertAfterSection(idx) => fm.lines.insert(idx + 1, format!("{section_prefix}{key}: {rendered}")),
			Target::Missing => match section {
				None => fm.lines.insert(0, format!("{key}: {rendered}")),
				Some(name) => {
					fm.lines.push(format!("{name}:"));
					fm.lines.push(format!("  {key}: {rendered}"));
				}
			},
		}
		true
	}

	//==========================================================================
	// Body
	//==========================================================================

	/// Section indices belonging to a part (`# User Story`), or the whole body.
	/// A part runs until the next part heading; other level-1 headings stay inside it.
	fn scope_range(&self, scope: Option<&str>) -> Option<Range<usize>> {
		let Some(part) = scope else { return Some(0..self.sections.len()) };
		let start = self.sections.iter().position(|s| s.is(1, part))? + 1;
		let end = self.sections[start..]
			.iter()
			.position(|s| s.heading.as_ref().is_some_and(|(h, _)| h.level == 1 && Part::from_heading(&h.content).is_some()))
			.map(|i| start + i)
			.unwrap_or(self.sections.len());
		Some(start..end)
	}

	fn find_section(&self, scope: Option<&str>, title: &str) -> Option<usize> {
		let range = self.scope_range(scope)?;
		range.into_iter().find(|&i| self.sections[i].is(2, title))
	}

	/// The section at `idx` plus its deeper subsections.
	fn section_span(&self, idx: usize) -> Range<usize> {
		let end = self.sections[idx + 1..]
			.iter()
			.position(|s| s.level().is_some_and(|l| l <= 2))
			.map(|i| idx + 1 + i)
			.unwrap_or(self.sections.len());
		idx..end
	}

	/// Text under `## title` up to the next `##` or `#` heading. Deeper subsections are
	/// part of it, their heading lines included.
	pub fn section_body(&self, scope: Option<&str>, title: &str) -> Option<String> {
		let idx = self.find_section(scope, title)?;
		let span = self.section_span(idx);
		let mut lines: Vec<&str> = self.sections[idx].lines.iter().map(String::as_str).collect();
		for sub in &self.sections[span.start + 1..span.end] {
			if let Some((_, raw)) = &sub.heading {
				lines.push(raw);
			}
			lines.extend(sub.lines.iter().map(String::as_str));
		}
		Some(lines.join("\n"))
	}

	/// Replace everything under `## title`, subsections included, creating the section if needed.
	pub fn replace_section_body(&mut self, scope: Option<&str>, title: &str, text: &str, placement: Placement) {
		let mut lines = vec![String::new()];
		lines.extend(text.trim().lines().map(str::to_string));

		match self.find_section(scope, title) {
			Some(idx) => {
				let span = self.section_span(idx);
				self.sections.drain(span.start + 1..span.end);
				if idx + 1 < self.sections.len() {
					lines.push(String::new());
				}
				self.sections[idx].lines = lines;
			}
			None => {
				let at = self.insertion_point(scope, placement);
				self.insert_section(at, Section::new(2, title, lines));
			}
		}
	}

	/// Replace the ADF block for `field_id` under `## title`, append one if the section has none,
	/// or create the section with placeholder text.
	pub fn upsert_rich_text(&mut self, scope: Option<&str>, title: &str, field_id: &str, doc: &Value) {
		let block = render_block(field_id, doc);

		let Some(idx) = self.find_section(scope, title) else {
			let mut lines = vec![String::new(), PLACEHOLDER_TEXT.to_string(), String::new()];
			lines.extend(block);
			let at = self.insertion_point(scope, Placement::BeforeReferences);
			self.insert_section(at, Section::new(2, title, lines));
			return;
		};

		for s in self.section_span(idx) {
			let lines = &mut self.sections[s].lines;
			if let Some(pos) = lines.iter().position(|l| marker_field_id(l) == Some(field_id)) {
				let range = block_range(lines, pos);
				lines.splice(range, block);
				return;
			}
		}

		let is_last = idx + 1 == self.sections.len();
		let lines = &mut self.sections[idx].lines;
		while lines.last().is_some_and(|l| l.trim().is_empty()) {
			lines.pop();
		}
		lines.push(String::new());
		lines.extend(block);
		if !is_last {
			lines.push(String::new());
		}
	}

	/// Index at which a new section goes, creating the part heading if it is missing.
	fn insertion_point(&mut self, scope: Option<&str>, placement: Placement) -> usize {
		let range = match self.scope_range(scope) {
			Some(range) => range,
			None => {
				let part = scope.unwrap_or_default();
				self.insert_section(self.sections.len(), Section::new(1, part, Vec::new()));
				self.sections.len()..self.sections.len()
			}
		};
		let start = match scope {
			// Keep whatever precedes the first heading (a title line, a preamble) above new sections.
			None => 1,
			Some(_) => range.start,
		};

		match placement {
			Placement::Start => start,
			Placement::After(anchor) => match self.find_section(scope, anchor) {
				Some(idx) => self.section_span(idx).end,
				None => start,
			},
			Placement::BeforeReferences => range.clone().find(|&i| self.sections[i].is(2, "References")).unwrap_or(range.end),
		}
	}

	fn insert_section(&mut self, at: usize, mut section: Section) {
		if at > 0 {
			let prev = &mut self.sections[at - 1];
			if !prev.ends_with_blank() {
				prev.lines.push(String::new());
			}
		}
		if at < self.sections.len() && !section.ends_with_blank() {
			section.lines.push(String::new());
		}
		self.sections.insert(at, section);
	}
}

impl std::fmt::Display for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut out: Vec<&str> = Vec::new();
		if let Some(fm) = &self.front_matter {
			out.push(&fm.open);
			out.extend(fm.lines.iter().map(String::as_str));
			out.push(&fm.close);
		}
		for section in &self.sections {
			if let Some((_, raw)) = &section.heading {
				out.push(raw);
			}
			out.extend(section.lines.iter().map(String::as_str));
		}
		write!(f, "{}", out.join(self.line_ending))?;
		if self.trailing_newline {
			f.write_str(self.line_ending)?;
		}
		Ok(())
	}
}

/// Double quotes, escaping `\` and `"`. Single quotes when the value has `"` but no `'`, which needs no escapes.
fn quote_scalar(value: &str) -> String {
	if value.contains('"') && !value.contains('\'') {
		format!("'{value}'")
	} else {
		format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
	}
}

/// Lines making up the `<details>` block around the marker at `marker`.
fn block_range(lines: &[String], marker: usize) -> std::ops::RangeInclusive<usize> {
	let start = if lines[marker].trim_start().starts_with("<details>") {
		marker
	} else if marker > 0 && lines[marker - 1].trim() == "<details>" {
		marker - 1
	} else {
		marker
	};

	let open = (marker + 1..lines.len()).find(|&j| lines[j].trim() == "```json");
	let close = open.and_then(|open| (open + 1..lines.len()).find(|&k| lines[k].trim() == "```"));
	let end = match close {
		Some(close) => match (close + 1..lines.len()).find(|&k| !lines[k].trim().is_empty()) {
			Some(k) if lines[k].trim() == "</details>" => k,
			_ => close,
		},
		None => marker,
	};
	start..=end
}
