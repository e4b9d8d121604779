//! Shared test infrastructure for integration tests.
//!
//! Provides `TestContext`: a temp directory seeded from a fixture string, plus
//! - library-level helpers that drive the sync commands against a [`MockJiraClient`]
//! - `run`, which drives the compiled binary with the mock wired in through `JIRASYNC_MOCK_STATE`
//!
//! # Example
//!
//! ```ignore
//! let ctx = TestContext::new(r#"
//!     //- /DRAFT - Epic - Billing.md
//!     ---
//!     jira_key: ""
//!     ---
//! "#);
//!
//! let (status, stdout, stderr) = ctx.run(&["create", "DRAFT - Epic - Billing.md"]);
//! assert!(status.success());
//! ```

use std::{
	path::{Path, PathBuf},
	process::{Command, ExitStatus},
	sync::OnceLock,
};

use color_eyre::eyre::Result;
use jirasync::{
	MockJiraClient,
	sync::{Outcome, SyncContext, SyncOptions},
};
use tempfile::TempDir;

static BINARY_COMPILED: OnceLock<()> = OnceLock::new();

/// Compile the binary with is_integration_test feature before running any tests
pub fn ensure_binary_compiled() {
	BINARY_COMPILED.get_or_init(|| {
		let status = Command::new("cargo")
			.args(["build", "--features", "is_integration_test"])
			.status()
			.expect("Failed to execute cargo build");

		if !status.success() {
			panic!("Failed to build binary with is_integration_test feature");
		}
	});
}

fn get_binary_path() -> PathBuf {
	ensure_binary_compiled();

	let mut path = std::env::current_exe().unwrap();
	path.pop(); // Remove test binary name
	path.pop(); // Remove 'deps'
	path.push(env!("CARGO_PKG_NAME"));
	path
}

/// Split a fixture into `(relative path, content)` pairs. Each file starts with a `//- /path` line;
/// the common indentation of the whole fixture is stripped first.
pub fn parse_fixture(fixture: &str) -> Vec<(String, String)> {
	let indent = fixture
		.lines()
		.filter(|l| !l.trim().is_empty())
		.map(|l| l.len() - l.trim_start().len())
		.min()
		.unwrap_or(0);

	let mut files: Vec<(String, String)> = Vec::new();
	for line in fixture.lines() {
		let line = line.get(indent..).unwrap_or("");
		if let Some(path) = line.strip_prefix("//- /") {
			files.push((path.trim().to_string(), String::new()));
		} else if let Some((_, content)) = files.last_mut() {
			content.push_str(line);
			content.push('\n');
		}
	}
	for (_, content) in &mut files {
		content.truncate(content.trim_end().len());
		content.push('\n');
	}
	files
}

pub struct TestContext {
	pub dir: TempDir,
	/// Mock Jira state read by the binary. Written by [`TestContext::set_mock_state`].
	pub mock_state_path: PathBuf,
}

impl TestContext {
	pub fn new(fixture: &str) -> Self {
		let dir = tempfile::tempdir().unwrap();
		for (path, content) in parse_fixture(fixture) {
			let full = dir.path().join(path);
			if let Some(parent) = full.parent() {
				std::fs::create_dir_all(parent).unwrap();
			}
			std::fs::write(full, content).unwrap();
		}
		let mock_state_path = dir.path().join("mock_state.json");
		Self { dir, mock_state_path }
	}

	pub fn path(&self, rel: &str) -> PathBuf {
		self.dir.path().join(rel)
	}

	pub fn read(&self, rel: &str) -> String {
		std::fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
	}

	pub fn exists(&self, rel: &str) -> bool {
		self.path(rel).exists()
	}

	/// Markdown files in the directory, sorted.
	pub fn files(&self) -> Vec<String> {
		let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
			.unwrap()
			.filter_map(|e| e.ok())
			.map(|e| e.file_name().to_string_lossy().into_owned())
			.filter(|n| n.ends_with(".md"))
			.collect();
		names.sort();
		names
	}

	pub fn set_mock_state(&self, state: &serde_json::Value) {
		std::fs::write(&self.mock_state_path, serde_json::to_string_pretty(state).unwrap()).unwrap();
	}

	/// Run one command through the library, against `mock`.
	pub fn sync(&self, mock: &MockJiraClient, opts: SyncOptions, rel: &str, step: fn(&SyncContext, &Path) -> Result<Outcome>) -> Result<Outcome> {
		let ctx = SyncContext::new(mock, "WOR", opts);
		step(&ctx, &self.path(rel))
	}

	/// Run the binary inside the temp directory.
	///
	/// Real credentials from the outer environment are removed. The mock is only wired in once
	/// [`TestContext::set_mock_state`] has been called; otherwise the binary runs without a client.
	///
	/// Returns (exit_status, stdout, stderr) for easy assertions.
	pub fn run(&self, args: &[&str]) -> (ExitStatus, String, String) {
		let mut cmd = Command::new(get_binary_path());
		cmd.args(args).current_dir(self.dir.path());
		for var in ["JIRA_BASE_URL", "JIRA_EMAIL", "JIRA_API_TOKEN", "JIRA_PROJECT_KEY", "JIRASYNC_LOG", "JIRASYNC_TRACE_FILE"] {
			cmd.env_remove(var);
		}
		if self.mock_state_path.exists() {
			cmd.env("JIRASYNC_MOCK_STATE", &self.mock_state_path);
		} else {
			cmd.env_remove("JIRASYNC_MOCK_STATE");
		}
		let output = cmd.output().unwrap();
		(
			output.status,
			String::from_utf8_lossy(&output.stdout).into_owned(),
			String::from_utf8_lossy(&output.stderr).into_owned(),
		)
	}
}

#[test]
fn test_parse_fixture() {
	let files = parse_fixture(
		r#"
		//- /a.md
		---
		jira_key: ""
		---
		//- /sub/b.md
		  indented
		"#,
	);
	assert_eq!(files, vec![
		("a.md".to_string(), "---\njira_key: \"\"\n---\n".to_string()),
		("sub/b.md".to_string(), "  indented\n".to_string()),
	]);
}
