//! Reconciling record files with Jira.
//!
//! Each command works on one file at a time and reports an [`Outcome`]; failures are returned as
//! errors and counted by [`batch::run_batch`], which keeps going with the next file.

pub mod batch;
pub mod create;
pub mod files;
pub mod pull;
pub mod push;
pub mod transition;

use std::{
	io::Write as _,
	path::{Path, PathBuf},
};

use color_eyre::eyre::{Result, WrapErr, eyre};
use smart_default::SmartDefault;

use crate::{
	fields::UserResolver,
	jira::JiraClient,
	record::{ParseContext, Record, RecordKind},
};

/// Flags shared by every command.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct SyncOptions {
	/// Print what would be sent or written, touch nothing.
	pub dry_run: bool,
	/// Push only: move issues to the status named in the record.
	#[default(true)]
	pub transition: bool,
	/// Skip kind auto-detection.
	pub kind: Option<RecordKind>,
}

/// Everything a command needs besides the file itself.
pub struct SyncContext<'a> {
	/// `None` when credentials are missing.
	pub client: Option<&'a dyn JiraClient>,
	/// Why `client` is `None`, reported when a command needs it.
	pub offline_reason: Option<String>,
	pub project_key: String,
	pub opts: SyncOptions,
}

impl<'a> SyncContext<'a> {
	pub fn new(client: &'a dyn JiraClient, project_key: impl Into<String>, opts: SyncOptions) -> Self {
		Self {
			client: Some(client),
			offline_reason: None,
			project_key: project_key.into(),
			opts,
		}
	}

	pub fn offline(reason: impl Into<String>, project_key: impl Into<String>, opts: SyncOptions) -> Self {
		Self {
			client: None,
			offline_reason: Some(reason.into()),
			project_key: project_key.into(),
			opts,
		}
	}

	/// The client, or the reason there is none.
	pub fn require_client(&self) -> Result<&'a dyn JiraClient> {
		self.client.ok_or_else(|| eyre!("{}", self.offline_reason.as_deref().unwrap_or("Jira client is not configured")))
	}

	/// Looks people up only when changes are really going to be sent.
	pub fn users(&self) -> UserResolver<'a> {
		UserResolver::new(self.client, !self.opts.dry_run)
	}
}

/// How a document went. Failures are errors instead.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outcome {
	/// Nothing needed doing.
	pub skipped: bool,
	/// Downgraded failures, already printed.
	pub warnings: Vec<String>,
}

impl Outcome {
	pub fn skipped() -> Self {
		Self { skipped: true, ..Default::default() }
	}

	pub(crate) fn warn(&mut self, msg: impl Into<String>) {
		let msg = msg.into();
		eprintln!("  ⚠ Warning: {msg}");
		tracing::debug!(warning = %msg, "downgraded failure");
		self.warnings.push(msg);
	}
}

/// A record file read and parsed.
pub(crate) struct LoadedRecord {
	pub path: PathBuf,
	pub content: String,
	pub record: Record,
}

pub(crate) fn load_record(path: &Path, kind: Option<RecordKind>) -> Result<LoadedRecord> {
	let content = std::fs::read_to_string(path).wrap_err_with(|| format!("File not found or unreadable: {}", path.display()))?;
	let ctx = ParseContext::new(content.clone(), path.display().to_string());
	let record = Record::parse(&content, &ctx, kind)?;
	tracing::info!(path = %path.display(), kind = %record.kind, key = %record.primary.meta.key, "loaded record");
	Ok(LoadedRecord {
		path: path.to_path_buf(),
		content,
		record,
	})
}

/// Replace `path` with `content` through a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
	let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
	let mut tmp = tempfile::NamedTempFile::new_in(dir).wrap_err_with(|| format!("Failed to create temp file in {}", dir.display()))?;
	tmp.write_all(content.as_bytes())?;
	tmp.persist(path).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
	Ok(())
}

pub(crate) fn file_name(path: &Path) -> String {
	path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}
