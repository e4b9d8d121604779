//! The `---` delimited key/value block at the top of a record.
//!
//! This is a fixed-schema extractor for the record templates, not a YAML parser.
//! Top-level keys hold scalars or inline lists. A top-level key with no value,
//! followed by indented lines, opens a section (`user_story:`, `subtask:`).
//! Nothing nests deeper than that; deeper lines are ignored.

use std::collections::BTreeMap;

use super::{ParseContext, RecordError};

/// A front matter value, as written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FmValue {
	Scalar(String),
	List(Vec<String>),
}

impl FmValue {
	/// Decode the text after `key:`.
	pub fn decode(raw: &str) -> Self {
		let v = raw.trim();
		if let Some(scalar) = unquote(v) {
			return Self::Scalar(scalar);
		}
		if v.starts_with('[')
			&& let Some(end) = v.find(']')
		{
			return Self::List(parse_inline_list(&v[1..end]));
		}
		Self::Scalar(strip_comment(v).to_string())
	}

	/// Scalar view. Lists are joined with `", "`.
	pub fn as_scalar(&self) -> String {
		match self {
			Self::Scalar(s) => s.clone(),
			Self::List(items) => items.join(", "),
		}
	}

	/// List view. A bare scalar is a one-element list, an empty one is empty.
	pub fn to_list(&self) -> Vec<String> {
		match self {
			Self::Scalar(s) if s.trim().is_empty() => Vec::new(),
			Self::Scalar(s) => vec![s.trim().to_string()],
			Self::List(items) => items.clone(),
		}
	}
}

fn parse_inline_list(inner: &str) -> Vec<String> {
	inner
		.split(',')
		.map(|item| {
			let item = item.trim();
			unquote(item).unwrap_or_else(|| item.to_string()).trim().to_string()
		})
		.filter(|item| !item.is_empty())
		.collect()
}

/// Byte index of the quote closing the string that opens `v`.
/// Inside double quotes, `\"` and `\\` are escapes.
fn closing_quote(v: &str) -> Option<usize> {
	let quote = v.chars().next().filter(|c| *c == '"' || *c == '\'')?;
	let mut escaped = false;
	for (i, c) in v.char_indices().skip(1) {
		match c {
			'\\' if quote == '"' && !escaped => escaped = true,
			c if c == quote && !escaped => return Some(i),
			_ => escaped = false,
		}
	}
	None
}

/// Contents of a quoted string, escapes resolved. `None` if `v` is not quoted.
fn unquote(v: &str) -> Option<String> {
	let end = closing_quote(v)?;
	let inner = &v[1..end];
	if !v.starts_with('"') {
		return Some(inner.to_string());
	}
	let mut out = String::with_capacity(inner.len());
	let mut chars = inner.chars();
	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		match chars.next() {
			Some(next @ ('"' | '\\')) => out.push(next),
			Some(next) => {
				out.push('\\');
				out.push(next);
			}
			None => out.push('\\'),
		}
	}
	Some(out)
}

fn strip_comment(v: &str) -> &str {
	if v.starts_with('#') {
		return "";
	}
	match v.find(" #") {
		Some(idx) => v[..idx].trim_end(),
		None => v,
	}
}

/// Trailing `# comment` of a raw value, including the whitespace before it.
/// Empty if the value carries no comment.
pub(super) fn comment_suffix(raw: &str) -> &str {
	let v = raw.trim_start();
	let value_end = match v.chars().next() {
		Some('"' | '\'') => closing_quote(v).map(|i| i + 1).unwrap_or(v.len()),
		Some('[') => v.find(']').map(|i| i + 1).unwrap_or(v.len()),
		Some('#') => 0,
		_ => v.find(" #").unwrap_or(v.len()),
	};
	let rest = &v[value_end..];
	if rest.trim_start().starts_with('#') { rest.trim_end() } else { "" }
}

/// Split `key: value` into its key and raw value. Keys are `[A-Za-z0-9_-]+`.
pub(super) fn split_key(line: &str) -> Option<(&str, &str)> {
	let (key, raw) = line.trim().split_once(':')?;
	let key = key.trim_end();
	if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
		return None;
	}
	Some((key, raw))
}

pub(super) fn indent_width(line: &str) -> usize {
	line.len() - line.trim_start_matches([' ', '\t']).len()
}

pub(super) fn is_marker(line: &str) -> bool {
	line.trim() == "---"
}

/// Index of the closing `---` line, given the document starts with an opening one.
pub(super) fn closing_marker(lines: &[&str]) -> Result<usize, ()> {
	match lines.first() {
		Some(first) if is_marker(first.trim_start_matches('\u{feff}')) => {}
		_ => return Err(()),
	}
	lines.iter().skip(1).position(|l| is_marker(l)).map(|i| i + 1).ok_or(())
}

/// Flat key/value map of one block.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Block {
	values: BTreeMap<String, FmValue>,
}

impl Block {
	pub fn get(&self, key: &str) -> Option<&FmValue> {
		self.values.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	/// Trimmed scalar, empty when absent.
	pub fn scalar(&self, key: &str) -> String {
		self.values.get(key).map(|v| v.as_scalar().trim().to_string()).unwrap_or_default()
	}

	/// List value, empty when absent.
	pub fn list(&self, key: &str) -> Vec<String> {
		self.values.get(key).map(FmValue::to_list).unwrap_or_default()
	}

	fn insert(&mut self, key: &str, value: FmValue) {
		self.values.insert(key.to_string(), value);
	}
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FrontMatter {
	root: Block,
	sections: BTreeMap<String, Block>,
	/// 1-indexed line of the closing marker.
	pub end_line: usize,
}

impl FrontMatter {
	pub fn parse(content: &str, ctx: &ParseContext) -> Result<Self, RecordError> {
		let lines: Vec<&str> = content.split('\n').collect();
		let close = match closing_marker(&lines) {
			Ok(close) => close,
			Err(()) if lines.first().is_some_and(|l| is_marker(l.trim_start_matches('\u{feff}'))) =>
				return Err(RecordError::UnterminatedFrontMatter {
					src: ctx.named_source(),
					span: ctx.line_span(1),
				}),
			Err(()) => return Err(RecordError::MissingFrontMatter),
		};

		let mut fm = Self {
			end_line: close + 1,
			..Default::default()
		};
		let mut current_section: Option<String> = None;
		let mut section_indent: Option<usize> = None;

		for line in &lines[1..close] {
			let trimmed = line.trim();
			if trimmed.is_empty() || trimmed.starts_with('#') {
				continue;
			}
			let Some((key, raw)) = split_key(line) else { continue };
			let indent = indent_width(line);

			if indent == 0 {
				let value = FmValue::decode(raw);
				// An empty value may open a section; it is only a section once indented lines follow.
				current_section = (value == FmValue::Scalar(String::new())).then(|| key.to_string());
				section_indent = None;
				fm.root.insert(key, value);
				continue;
			}

			let Some(section) = &current_section else {
				tracing::debug!("ignoring indented front matter line outside a section: {trimmed}");
				continue;
			};
			let expected = *section_indent.get_or_insert(indent);
			if indent > expected {
				tracing::debug!("ignoring nested front matter line: {trimmed}");
				continue;
			}
			fm.sections.entry(section.clone()).or_default().insert(key, FmValue::decode(raw));
		}

		Ok(fm)
	}

	pub fn root(&self) -> &Block {
		&self.root
	}

	pub fn has_section(&self, name: &str) -> bool {
		self.sections.contains_key(name)
	}

	/// Indented block under `name:`.
	pub fn section(&self, name: &str) -> Result<&Block, RecordError> {
		self.sections.get(name).ok_or_else(|| RecordError::MissingSection { section: name.to_string() })
	}
}
