//! Running one command over many files.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Report, Result};
use miette::GraphicalReportHandler;

use super::Outcome;
use crate::record::RecordError;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchReport {
	pub succeeded: usize,
	pub failed: usize,
	/// Warnings across all succeeded documents.
	pub warnings: usize,
}

impl BatchReport {
	pub fn total(&self) -> usize {
		self.succeeded + self.failed
	}

	/// 0 if every document went through; 1 if any failed or there was nothing to do.
	pub fn exit_code(&self) -> i32 {
		if self.failed > 0 || self.total() == 0 { 1 } else { 0 }
	}
}

/// Run `step` on every file in order. A failure is reported and counted, then the batch moves on.
pub fn run_batch(files: &[PathBuf], mut step: impl FnMut(&Path) -> Result<Outcome>) -> BatchReport {
	let mut report = BatchReport::default();
	if files.is_empty() {
		eprintln!("No files found to process.");
		return report;
	}

	println!("Processing {} file(s)...", files.len());
	for path in files {
		let _span = tracing::info_span!("document", path = %path.display()).entered();
		match step(path) {
			Ok(outcome) => {
				report.succeeded += 1;
				report.warnings += outcome.warnings.len();
			}
			Err(e) => {
				report.failed += 1;
				tracing::debug!(error = ?e, "document failed");
				eprintln!("✗ {}: {}", path.display(), render_error(&e));
			}
		}
	}

	println!("\n{}", "=".repeat(60));
	println!("Summary: {} succeeded, {} failed", report.succeeded, report.failed);
	println!("{}", "=".repeat(60));
	report
}

/// Parse errors get miette's source excerpt; everything else its context chain.
pub fn render_error(e: &Report) -> String {
	if let Some(record_error) = e.downcast_ref::<RecordError>() {
		let mut out = String::new();
		if GraphicalReportHandler::new().render_report(&mut out, record_error).is_ok() {
			return out;
		}
	}
	format!("{e:#}")
}
