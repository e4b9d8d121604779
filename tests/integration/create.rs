use jirasync::{
	MockJiraClient, ParseContext, Record, RecordKind,
	sync::{SyncOptions, create::create_file},
};
use serde_json::json;

use crate::common::TestContext;

const EPIC: &str = r#"
	//- /DRAFT - Epic - Billing revamp.md
	---
	jira_key: ""
	status: "To Do"
	labels: [billing]
	---

	## Problem Statement

	Invoices are slow.
"#;

const STORY: &str = r#"
	//- /DRAFT - Story - Export reports.md
	---
	user_story:
	  jira_key: ""
	  parent_key: "WOR-10"   # Feature
	  story_points: 3
	subtask:
	  jira_key: ""
	  parent_key: ""
	---

	# User Story

	## Acceptance Criteria

	Users can export reports

	# Subtask

	## Acceptance Criteria

	Build the exporter
"#;

#[test]
fn test_epic_created_and_renamed() {
	let ctx = TestContext::new(EPIC);
	let mock = MockJiraClient::new();

	let outcome = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Epic - Billing revamp.md", create_file).unwrap();
	assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
	assert_eq!(mock.call_log(), vec!["create_issue 10186".to_string(), "update_issue WOR-100 [customfield_10322]".to_string()]);

	let issue = mock.issue("WOR-100").unwrap();
	assert_eq!(issue["summary"], json!("Billing revamp"));
	assert_eq!(issue["labels"], json!(["billing"]));
	assert_eq!(issue["customfield_10322"], json!("Invoices are slow."));

	assert_eq!(ctx.files(), vec!["WOR-100 - Billing revamp.md".to_string()]);
	let content = ctx.read("WOR-100 - Billing revamp.md");
	assert!(content.contains("jira_key: \"WOR-100\""), "{content}");
	assert!(content.contains("Invoices are slow."));
}

#[test]
fn test_feature_rich_text_split_between_create_and_followup() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Feature - Bulk export.md
		---
		jira_key: ""
		parent_key: "WOR-1"
		---

		## Description

		Export everything at once.

		<details>
		<summary>ADF Version (description)</summary>

		```json
		{"type": "doc", "version": 1, "content": []}
		```
		</details>

		## Business Problem (customfield_10255)

		Manual exports take hours.

		<details>
		<summary>ADF Version (customfield_10255)</summary>

		```json
		{"type": "doc", "version": 1, "content": []}
		```
		</details>
		"#,
	);
	let mock = MockJiraClient::new();

	ctx.sync(&mock, SyncOptions::default(), "DRAFT - Feature - Bulk export.md", create_file).unwrap();
	assert_eq!(mock.call_log(), vec!["create_issue Feature".to_string(), "update_issue WOR-100 [customfield_10255]".to_string()]);

	let issue = mock.issue("WOR-100").unwrap();
	assert_eq!(issue["parent"], json!({"key": "WOR-1"}));
	assert_eq!(issue["description"]["type"], json!("doc"));
	assert_eq!(issue["summary"], json!("Bulk export"));
	assert!(ctx.exists("WOR-100 - Bulk export.md"));
}

#[test]
fn test_story_and_subtask_created() {
	let ctx = TestContext::new(STORY);
	let mock = MockJiraClient::new();

	let outcome = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Story - Export reports.md", create_file).unwrap();
	assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
	assert_eq!(mock.call_log(), vec!["create_issue 10007".to_string(), "create_issue 10184".to_string()]);

	let story = mock.issue("WOR-100").unwrap();
	assert_eq!(story["summary"], json!("Users can export reports"));
	assert_eq!(story["customfield_10014"], json!("WOR-10"));
	assert_eq!(story["customfield_10037"], json!(3.0));

	let subtask = mock.issue("WOR-101").unwrap();
	assert_eq!(subtask["summary"], json!("Build the exporter"));
	assert_eq!(subtask["parent"], json!({"key": "WOR-100"}));
	// Subtask has no points of its own, so it takes the Story's.
	assert_eq!(subtask["customfield_10016"], json!(3.0));

	let content = ctx.read("WOR-100 - Export reports.md");
	assert!(content.contains("user_story:\n  jira_key: \"WOR-100\""), "{content}");
	assert!(content.contains("  jira_key: \"WOR-101\""), "{content}");
	assert!(content.contains("  parent_key: \"WOR-100\""), "{content}");
}

#[test]
fn test_written_keys_parse_back() {
	let ctx = TestContext::new(STORY);
	let mock = MockJiraClient::new();
	ctx.sync(&mock, SyncOptions::default(), "DRAFT - Story - Export reports.md", create_file).unwrap();

	let content = ctx.read("WOR-100 - Export reports.md");
	let parse_ctx = ParseContext::new(content.clone(), "WOR-100 - Export reports.md");
	let record = Record::parse(&content, &parse_ctx, None).unwrap_or_else(|e| panic!("{e}\n{content}"));
	assert_eq!(record.kind, RecordKind::Story);
	assert_eq!(record.primary.meta.key, "WOR-100");
	assert_eq!(record.primary.meta.parent_key, "WOR-10");
	let subtask = record.subtask.as_ref().unwrap();
	assert_eq!(subtask.meta.key, "WOR-101");
	assert_eq!(subtask.meta.parent_key, "WOR-100");
	assert!(record.entities().all(|e| !e.is_draft()));
}

#[test]
fn test_rename_collision_is_a_warning() {
	let ctx = TestContext::new(EPIC);
	std::fs::write(ctx.path("WOR-100 - Billing revamp.md"), "unrelated notes\n").unwrap();
	let mock = MockJiraClient::new();

	let outcome = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Epic - Billing revamp.md", create_file).unwrap();
	assert_eq!(outcome.warnings.len(), 1, "{:?}", outcome.warnings);
	assert!(outcome.warnings[0].contains("already exists"), "{}", outcome.warnings[0]);
	assert_eq!(ctx.read("WOR-100 - Billing revamp.md"), "unrelated notes\n");
	assert!(ctx.read("DRAFT - Epic - Billing revamp.md").contains("jira_key: \"WOR-100\""));
}

#[test]
fn test_subtask_failure_is_a_warning() {
	let ctx = TestContext::new(STORY);
	let mock = MockJiraClient::new();
	mock.reject_create("10184", 400, r#"{"errors":{"summary":"Summary is required."}}"#);

	let outcome = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Story - Export reports.md", create_file).unwrap();
	assert_eq!(outcome.warnings.len(), 1);
	assert!(outcome.warnings[0].starts_with("Failed to create Subtask"), "{}", outcome.warnings[0]);

	let content = ctx.read("WOR-100 - Export reports.md");
	assert!(content.contains("user_story:\n  jira_key: \"WOR-100\""), "{content}");
	assert!(!content.contains("WOR-101"));
}

#[test]
fn test_followup_failure_is_a_warning() {
	let ctx = TestContext::new(EPIC);
	let mock = MockJiraClient::new();
	mock.reject_update("WOR-100", None, 400, r#"{"errors":{"customfield_10322":"Field cannot be set."}}"#);

	let outcome = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Epic - Billing revamp.md", create_file).unwrap();
	assert_eq!(outcome.warnings.len(), 1);
	assert!(outcome.warnings[0].contains("additional fields of WOR-100"), "{}", outcome.warnings[0]);
	assert!(ctx.exists("WOR-100 - Billing revamp.md"));
}

#[test]
fn test_existing_key_makes_no_calls() {
	let ctx = TestContext::new(
		r#"
		//- /WOR-5 - Done already.md
		---
		jira_key: "WOR-5"
		---
		"#,
	);
	let mock = MockJiraClient::new();
	let before = ctx.read("WOR-5 - Done already.md");

	let outcome = ctx.sync(&mock, SyncOptions::default(), "WOR-5 - Done already.md", create_file).unwrap();
	assert!(outcome.skipped);
	assert!(mock.call_log().is_empty());
	assert_eq!(ctx.read("WOR-5 - Done already.md"), before);
}

#[test]
fn test_dry_run_touches_nothing() {
	let ctx = TestContext::new(EPIC);
	let mock = MockJiraClient::new();
	let opts = SyncOptions { dry_run: true, ..Default::default() };

	let outcome = ctx.sync(&mock, opts, "DRAFT - Epic - Billing revamp.md", create_file).unwrap();
	assert!(!outcome.skipped);
	assert!(mock.call_log().is_empty());
	assert_eq!(ctx.files(), vec!["DRAFT - Epic - Billing revamp.md".to_string()]);
	assert!(ctx.read("DRAFT - Epic - Billing revamp.md").contains("jira_key: \"\""));
}

#[test]
fn test_story_without_parent_is_rejected() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Story - Orphan.md
		---
		user_story:
		  jira_key: ""
		---
		"#,
	);
	let mock = MockJiraClient::new();

	let err = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Story - Orphan.md", create_file).unwrap_err();
	assert!(format!("{err:#}").contains("user_story.parent_key is required"), "{err:#}");
	assert!(mock.call_log().is_empty());
}
