//! Error types for parsing record files.
//!
//! Uses miette for rich diagnostics with source code spans.

#![allow(unused_assignments)] // Fields are read by miette's derive macro via attributes

use miette::{Diagnostic, NamedSource, SourceSpan};

/// Error type for record parsing and validation.
/// Provides detailed error messages with source locations.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum RecordError {
	#[error("missing front matter")]
	#[diagnostic(code(jirasync::format::missing_front_matter), help("records must start with a line containing only '---'"))]
	MissingFrontMatter,

	#[error("front matter is not terminated")]
	#[diagnostic(code(jirasync::format::unterminated_front_matter), help("close the front matter with a second '---' line"))]
	UnterminatedFrontMatter {
		#[source_code]
		src: NamedSource<String>,
		#[label("opened here, never closed")]
		span: SourceSpan,
	},

	#[error("missing '{section}:' section in front matter")]
	#[diagnostic(code(jirasync::format::missing_section), help("story records need an indented '{section}:' block"))]
	MissingSection { section: String },

	#[error("invalid JSON in ADF block for {field_id} (line {line}): {message}")]
	#[diagnostic(code(jirasync::content::invalid_adf))]
	InvalidRichText {
		field_id: String,
		line: usize,
		message: String,
		#[source_code]
		src: NamedSource<String>,
		#[label("{message}")]
		span: SourceSpan,
	},

	#[error("{0}")]
	#[diagnostic(code(jirasync::validation))]
	Validation(String),
}

/// Broad category of a [`RecordError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordErrorKind {
	/// Structure of the document is wrong.
	Format,
	/// An embedded payload does not parse.
	Content,
	/// Parsed fine, but the values contradict each other.
	Validation,
}

impl RecordError {
	pub fn validation(msg: impl Into<String>) -> Self {
		Self::Validation(msg.into())
	}

	pub fn kind(&self) -> RecordErrorKind {
		match self {
			Self::MissingFrontMatter | Self::UnterminatedFrontMatter { .. } | Self::MissingSection { .. } => RecordErrorKind::Format,
			Self::InvalidRichText { .. } => RecordErrorKind::Content,
			Self::Validation(_) => RecordErrorKind::Validation,
		}
	}
}

/// Holds source content and filename for error reporting.
#[derive(Clone, Debug)]
pub struct ParseContext {
	pub content: String,
	pub filename: String,
}

impl ParseContext {
	pub fn new(content: String, filename: impl Into<String>) -> Self {
		Self { content, filename: filename.into() }
	}

	/// Create a NamedSource for miette diagnostics.
	pub fn named_source(&self) -> NamedSource<String> {
		NamedSource::new(&self.filename, self.content.clone())
	}

	/// Get byte offset for a given line number (1-indexed).
	pub fn line_offset(&self, line_num: usize) -> usize {
		self.content.split('\n').take(line_num.saturating_sub(1)).map(|l| l.len() + 1).sum()
	}

	/// Get span for an entire line (1-indexed line number).
	pub fn line_span(&self, line_num: usize) -> SourceSpan {
		let offset = self.line_offset(line_num);
		let len = self.content.split('\n').nth(line_num.saturating_sub(1)).map(|l| l.len()).unwrap_or(0);
		(offset, len).into()
	}

	/// Span covering lines `first..=last` (1-indexed).
	pub fn lines_span(&self, first: usize, last: usize) -> SourceSpan {
		if last < first {
			return self.line_span(first);
		}
		let start = self.line_offset(first);
		let end = self.line_offset(last) + self.content.split('\n').nth(last.saturating_sub(1)).map(|l| l.len()).unwrap_or(0);
		(start, end.saturating_sub(start)).into()
	}
}
