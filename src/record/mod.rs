//! Local record format.
//!
//! This module contains the canonical representation of record files,
//! including parsing, the rewritable document model, and all pure types.
//!
//! A record is a Markdown file with a `---` front matter block and
//! ADF payloads embedded as fenced JSON under `ADF Version (<field id>)`
//! markers. Story records carry two entities, split by the `# User Story`
//! and `# Subtask` headings.

mod document;
pub use document::{Document, Placement};

mod error;
pub use error::{ParseContext, RecordError, RecordErrorKind};

mod front_matter;
pub use front_matter::{Block, FmValue, FrontMatter};

mod marks;
pub use marks::normalize_marks;

mod rich_text;
pub use rich_text::{RichTextBlock, extract_blocks, extract_fields, extract_paired_fields, render_block};

mod types;
pub use types::{Entity, EntityKind, EntityMeta, Part, Record, RecordKind, SUMMARY_LIMIT, truncate_chars};

// Re-export Header from parent
pub use crate::Header;
