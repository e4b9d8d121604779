use jirasync::{
	MockJiraClient,
	sync::{SyncContext, SyncOptions, pull::pull_file},
};
use serde_json::json;

use crate::common::TestContext;

const FEATURE: &str = r#"
	//- /WOR-7 - Bulk export.md
	---
	jira_key: "WOR-7"
	parent_key: "WOR-1"
	status: "To Do"   # updated by pull
	labels: [old]
	---

	## Description

	Stale text.
"#;

fn feature_mock() -> MockJiraClient {
	let mock = MockJiraClient::new();
	mock.add_issue(
		"WOR-7",
		json!({
			"summary": "Bulk export",
			"status": {"name": "In Progress"},
			"assignee": {"accountId": "acc-dev-00001", "emailAddress": "dev@example.com"},
			"parent": {"key": "WOR-1"},
			"labels": ["billing", "q3"],
			"customfield_10026": 5.0,
			"customfield_10020": [{"id": 42, "name": "Sprint 9"}],
			"created": "2024-01-02T03:04:05.000+0000",
			"description": {"type": "doc", "version": 1, "content": []},
		}),
	);
	mock
}

#[test]
fn test_pull_rewrites_fields_and_sections() {
	let ctx = TestContext::new(FEATURE);
	let mock = feature_mock();

	ctx.sync(&mock, SyncOptions::default(), "WOR-7 - Bulk export.md", pull_file).unwrap();
	assert_eq!(mock.call_log(), vec!["fetch_issue WOR-7".to_string()]);

	let content = ctx.read("WOR-7 - Bulk export.md");
	for expected in [
		"status: \"In Progress\"   # updated by pull",
		"assignee: \"dev@example.com\"",
		"sprint_id: \"42\"",
		"story_points: \"5.0\"",
		"labels: [\"billing\", \"q3\"]",
		"created_at: \"2024-01-02T03:04:05.000+0000\"",
		"## Summary\n\nBulk export",
		"<summary>ADF Version (description)</summary>",
	] {
		assert!(content.contains(expected), "missing {expected:?} in:\n{content}");
	}
	assert!(!content.contains("[old]"), "{content}");
	// Markdown the pull does not own stays.
	assert!(content.contains("Stale text."));
}

#[test]
fn test_second_pull_is_a_no_op() {
	let ctx = TestContext::new(FEATURE);
	let mock = feature_mock();

	ctx.sync(&mock, SyncOptions::default(), "WOR-7 - Bulk export.md", pull_file).unwrap();
	let first = ctx.read("WOR-7 - Bulk export.md");
	ctx.sync(&mock, SyncOptions::default(), "WOR-7 - Bulk export.md", pull_file).unwrap();
	assert_eq!(ctx.read("WOR-7 - Bulk export.md"), first);
}

#[test]
fn test_story_pull_scopes_subtask() {
	let ctx = TestContext::new(
		r#"
		//- /WOR-20 - Export.md
		---
		user_story:
		  jira_key: "WOR-20"
		  parent_key: "WOR-10"
		subtask:
		  jira_key: "WOR-21"
		  parent_key: "WOR-20"
		---

		# User Story

		## Acceptance Criteria

		Users can export reports

		# Subtask

		## Acceptance Criteria

		Build the exporter
		"#,
	);
	let mock = MockJiraClient::new();
	mock.add_issue("WOR-20", json!({"status": {"name": "In Progress"}, "customfield_10014": "WOR-10"}));
	mock.add_issue("WOR-21", json!({"status": {"name": "Done"}, "parent": {"key": "WOR-20"}, "customfield_10016": 2}));

	ctx.sync(&mock, SyncOptions::default(), "WOR-20 - Export.md", pull_file).unwrap();
	assert_eq!(mock.call_log(), vec!["fetch_issue WOR-20".to_string(), "fetch_issue WOR-21".to_string()]);

	let content = ctx.read("WOR-20 - Export.md");
	let (user_story, subtask) = content.split_once("subtask:").unwrap();
	assert!(user_story.contains("  status: \"In Progress\""), "{content}");
	assert!(subtask.contains("  status: \"Done\""), "{content}");
	assert!(subtask.contains("  story_points: \"2\""), "{content}");
}

#[test]
fn test_dry_run_writes_nothing() {
	let ctx = TestContext::new(FEATURE);
	let mock = feature_mock();
	let before = ctx.read("WOR-7 - Bulk export.md");

	ctx.sync(&mock, SyncOptions { dry_run: true, ..Default::default() }, "WOR-7 - Bulk export.md", pull_file).unwrap();
	assert_eq!(mock.call_log(), vec!["fetch_issue WOR-7".to_string()]);
	assert_eq!(ctx.read("WOR-7 - Bulk export.md"), before);
}

#[test]
fn test_missing_remote_issue_fails() {
	let ctx = TestContext::new(FEATURE);
	let mock = MockJiraClient::new();

	let err = ctx.sync(&mock, SyncOptions::default(), "WOR-7 - Bulk export.md", pull_file).unwrap_err();
	let message = format!("{err:#}");
	assert!(message.starts_with("Error fetching Feature WOR-7"), "{message}");
	assert!(message.contains("HTTP 404"), "{message}");
}

#[test]
fn test_pull_needs_key_and_client() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Epic - New.md
		---
		jira_key: ""
		---
		"#,
	);
	let mock = MockJiraClient::new();
	let err = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Epic - New.md", pull_file).unwrap_err();
	assert!(err.to_string().contains("Could not find jira_key"), "{err}");

	let feature = TestContext::new(FEATURE);
	let offline = SyncContext::offline("Missing required env var: JIRA_EMAIL", "WOR", SyncOptions { dry_run: true, ..Default::default() });
	let err = pull_file(&offline, &feature.path("WOR-7 - Bulk export.md")).unwrap_err();
	assert_eq!(err.to_string(), "Missing required env var: JIRA_EMAIL");
}
