//! The binary end to end, with the mock client wired in through `JIRASYNC_MOCK_STATE`.

use serde_json::json;

use crate::common::TestContext;

#[test]
fn test_create_through_glob() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Epic - Billing revamp.md
		---
		jira_key: ""
		---

		## Summary

		Fix the thing
		"#,
	);
	ctx.set_mock_state(&json!({ "issues": [] }));

	let (status, stdout, stderr) = ctx.run(&["create", "DRAFT*.md"]);
	assert!(status.success(), "stdout:\n{stdout}\nstderr:\n{stderr}");
	assert!(stdout.contains("Processing 1 file(s)..."), "{stdout}");
	assert!(stdout.contains("✓ Created Epic: WOR-100"), "{stdout}");
	assert!(stdout.contains("Summary: 1 succeeded, 0 failed"), "{stdout}");
	assert_eq!(ctx.files(), vec!["WOR-100 - Billing revamp.md".to_string()]);
}

#[test]
fn test_dry_run_create_without_credentials() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Epic - Billing revamp.md
		---
		jira_key: ""
		---

		## Summary

		Fix the thing
		"#,
	);

	let (status, stdout, stderr) = ctx.run(&["create", "--dry-run", "DRAFT - Epic - Billing revamp.md"]);
	assert!(status.success(), "stdout:\n{stdout}\nstderr:\n{stderr}");
	assert!(stdout.contains("[dry-run] Would create Epic with fields:"), "{stdout}");
	assert!(stdout.contains("\"summary\": \"Fix the thing\""), "{stdout}");
	assert!(ctx.exists("DRAFT - Epic - Billing revamp.md"));
}

#[test]
fn test_push_dry_run_without_credentials_warns() {
	let ctx = TestContext::new(
		r#"
		//- /WOR-1 - Billing revamp.md
		---
		jira_key: "WOR-1"
		status: "Done"
		---
		"#,
	);

	let (status, stdout, stderr) = ctx.run(&["push", "--dry-run", "WOR-1 - Billing revamp.md"]);
	assert!(status.success(), "stdout:\n{stdout}\nstderr:\n{stderr}");
	assert!(stderr.contains("⚠ Warning: Skipping transitions: Jira env vars not set."), "{stderr}");
}

#[test]
fn test_pull_through_binary() {
	let ctx = TestContext::new(
		r#"
		//- /WOR-7 - Bulk export.md
		---
		jira_key: "WOR-7"
		status: "To Do"
		---
		"#,
	);
	ctx.set_mock_state(&json!({
		"issues": [{ "key": "WOR-7", "fields": { "summary": "Bulk export", "status": { "name": "Done" } } }]
	}));

	let (status, stdout, stderr) = ctx.run(&["pull", "--kind", "feature", "WOR-7 - Bulk export.md"]);
	assert!(status.success(), "stdout:\n{stdout}\nstderr:\n{stderr}");
	assert!(stdout.contains("✓ Fetched Feature: status=Done, assignee=unassigned"), "{stdout}");
	assert!(stdout.contains("✓ Updated local file"), "{stdout}");
	assert!(ctx.read("WOR-7 - Bulk export.md").contains("status: \"Done\""));
}

#[test]
fn test_failures_are_counted_and_batch_continues() {
	let ctx = TestContext::new(
		r#"
		//- /a.md
		---
		user_story:
		  jira_key: ""
		---
		//- /b.md
		---
		jira_key: ""
		---

		## Summary

		Fix the thing
		"#,
	);
	ctx.set_mock_state(&json!({ "issues": [] }));

	let (status, stdout, stderr) = ctx.run(&["create", "a.md", "b.md"]);
	assert_eq!(status.code(), Some(1), "stdout:\n{stdout}\nstderr:\n{stderr}");
	assert!(stderr.contains("user_story.parent_key is required"), "{stderr}");
	assert!(stdout.contains("✓ Created Epic: WOR-100"), "{stdout}");
	assert!(stdout.contains("Summary: 1 succeeded, 1 failed"), "{stdout}");
}

#[test]
fn test_missing_credentials_fail_real_runs() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Epic - X.md
		---
		jira_key: ""
		---
		"#,
	);

	let (status, _, stderr) = ctx.run(&["create", "DRAFT - Epic - X.md"]);
	assert_eq!(status.code(), Some(1));
	assert!(stderr.contains("Missing required env var: JIRA_BASE_URL"), "{stderr}");
}

#[test]
fn test_no_matching_files() {
	let ctx = TestContext::new("");

	let (status, _, stderr) = ctx.run(&["pull", "nothing-*.md"]);
	assert_eq!(status.code(), Some(1));
	assert!(stderr.contains("No files found to process."), "{stderr}");
}

#[test]
fn test_completions() {
	let ctx = TestContext::new("");

	let (status, stdout, _) = ctx.run(&["completions", "bash"]);
	assert!(status.success());
	assert!(stdout.contains("jirasync"));
}
