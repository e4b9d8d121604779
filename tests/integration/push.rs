use jirasync::{
	MockJiraClient,
	sync::{SyncContext, SyncOptions, push::push_file},
};
use serde_json::json;

use crate::common::TestContext;

const STORY: &str = r#"
	//- /WOR-20 - Export reports.md
	---
	user_story:
	  jira_key: "WOR-20"
	  parent_key: "WOR-10"
	  sprint_id: 7
	  labels: [api]
	subtask:
	  jira_key: "WOR-21"
	  parent_key: "WOR-20"
	---

	# User Story

	## Acceptance Criteria

	Users can export reports
"#;

const EPIC: &str = r#"
	//- /WOR-1 - Billing revamp.md
	---
	jira_key: "WOR-1"
	status: "Done"
	---

	## Summary

	Billing revamp
"#;

const CLOSED_SPRINT_BODY: &str = r#"{"errorMessages":[],"errors":{"customfield_10020":"Issue can be assigned only active or future sprints."}}"#;

fn no_transition() -> SyncOptions {
	SyncOptions { transition: false, ..Default::default() }
}

fn story_mock() -> MockJiraClient {
	let mock = MockJiraClient::new();
	mock.add_issue("WOR-20", json!({}));
	mock.add_issue("WOR-21", json!({}));
	mock
}

#[test]
fn test_story_and_subtask_updated() {
	let ctx = TestContext::new(STORY);
	let mock = story_mock();

	let outcome = ctx.sync(&mock, no_transition(), "WOR-20 - Export reports.md", push_file).unwrap();
	assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
	assert_eq!(mock.call_log(), vec![
		"update_issue WOR-20 [customfield_10020, labels]".to_string(),
		"update_issue WOR-21 [parent]".to_string(),
	]);
	assert_eq!(mock.issue("WOR-20").unwrap()["customfield_10020"], json!(7));
	assert_eq!(mock.issue("WOR-21").unwrap()["parent"], json!({"key": "WOR-20"}));
}

#[test]
fn test_closed_sprint_retried_without_sprint() {
	let ctx = TestContext::new(STORY);
	let mock = story_mock();
	mock.reject_update("WOR-20", Some("customfield_10020"), 400, CLOSED_SPRINT_BODY);

	let outcome = ctx.sync(&mock, no_transition(), "WOR-20 - Export reports.md", push_file).unwrap();
	assert_eq!(outcome.warnings, vec!["Story WOR-20: sprint rejected, retrying without sprint".to_string()]);
	assert_eq!(mock.call_log(), vec![
		"update_issue WOR-20 [customfield_10020, labels]".to_string(),
		"update_issue WOR-20 [labels]".to_string(),
		"update_issue WOR-21 [parent]".to_string(),
	]);
	let story = mock.issue("WOR-20").unwrap();
	assert_eq!(story["labels"], json!(["api"]));
	assert!(!story.contains_key("customfield_10020"));
}

#[test]
fn test_subtask_parent_retried_without_parent() {
	let ctx = TestContext::new(STORY);
	let mock = story_mock();
	mock.reject_update("WOR-21", Some("parent"), 400, r#"{"errors":{"parent":"Given parent issue does not belong to appropriate hierarchy."}}"#);

	let outcome = ctx.sync(&mock, no_transition(), "WOR-20 - Export reports.md", push_file).unwrap();
	assert_eq!(outcome.warnings, vec!["Subtask WOR-21: parent rejected, retrying without parent".to_string()]);
	// Nothing is left once parent is dropped, and the retry still goes out.
	assert_eq!(mock.call_log().last().map(String::as_str), Some("update_issue WOR-21 []"));
}

#[test]
fn test_other_failure_fails_the_record() {
	let ctx = TestContext::new(STORY);
	let mock = story_mock();
	mock.reject_update("WOR-20", None, 500, "Internal server error");

	let err = ctx.sync(&mock, no_transition(), "WOR-20 - Export reports.md", push_file).unwrap_err();
	let message = format!("{err:#}");
	assert!(message.starts_with("Failed to update Story WOR-20"), "{message}");
	assert!(message.contains("HTTP 500"), "{message}");
	// Subtask is not attempted once the Story failed.
	assert_eq!(mock.call_log(), vec!["update_issue WOR-20 [customfield_10020, labels]".to_string()]);
}

#[test]
fn test_transition_to_recorded_status() {
	let ctx = TestContext::new(EPIC);
	let mock = MockJiraClient::new();
	mock.add_issue("WOR-1", json!({}));

	let outcome = ctx.sync(&mock, SyncOptions::default(), "WOR-1 - Billing revamp.md", push_file).unwrap();
	assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
	assert_eq!(mock.status_of("WOR-1").as_deref(), Some("Done"));
	assert_eq!(mock.call_log(), vec![
		"update_issue WOR-1 [summary]".to_string(),
		"fetch_issue WOR-1".to_string(),
		"transitions WOR-1".to_string(),
		"transition WOR-1 31".to_string(),
	]);
}

#[test]
fn test_transition_already_there_makes_no_calls() {
	let ctx = TestContext::new(EPIC);
	let mock = MockJiraClient::new();
	mock.add_issue("WOR-1", json!({"status": {"name": "Done"}}));

	ctx.sync(&mock, SyncOptions::default(), "WOR-1 - Billing revamp.md", push_file).unwrap();
	assert!(!mock.call_log().iter().any(|c| c.starts_with("transition")), "{:?}", mock.call_log());
}

#[test]
fn test_missing_transition_is_a_warning() {
	let ctx = TestContext::new(EPIC);
	let mock = MockJiraClient::new();
	mock.add_issue("WOR-1", json!({}));
	mock.set_workflow(&[("21", "Start Progress", "In Progress")]);

	let outcome = ctx.sync(&mock, SyncOptions::default(), "WOR-1 - Billing revamp.md", push_file).unwrap();
	assert_eq!(outcome.warnings.len(), 1);
	assert!(outcome.warnings[0].contains("No available transition for WOR-1: 'To Do' -> 'Done'"), "{}", outcome.warnings[0]);
	assert_eq!(mock.status_of("WOR-1").as_deref(), Some("To Do"));
}

#[test]
fn test_dry_run_sends_nothing() {
	let ctx = TestContext::new(STORY);
	let mock = story_mock();
	let opts = SyncOptions { dry_run: true, transition: false, ..Default::default() };

	ctx.sync(&mock, opts, "WOR-20 - Export reports.md", push_file).unwrap();
	assert!(mock.call_log().is_empty());
}

#[test]
fn test_offline_dry_run_skips_transitions() {
	let ctx = TestContext::new(EPIC);
	let sync_ctx = SyncContext::offline("Missing required env var: JIRA_BASE_URL", "WOR", SyncOptions { dry_run: true, ..Default::default() });

	let outcome = push_file(&sync_ctx, &ctx.path("WOR-1 - Billing revamp.md")).unwrap();
	assert_eq!(outcome.warnings, vec!["Skipping transitions: Jira env vars not set.".to_string()]);
}

#[test]
fn test_offline_push_needs_credentials() {
	let ctx = TestContext::new(EPIC);
	let sync_ctx = SyncContext::offline("Missing required env var: JIRA_BASE_URL", "WOR", SyncOptions::default());

	let err = push_file(&sync_ctx, &ctx.path("WOR-1 - Billing revamp.md")).unwrap_err();
	assert_eq!(err.to_string(), "Missing required env var: JIRA_BASE_URL");
}

#[test]
fn test_draft_cannot_be_pushed() {
	let ctx = TestContext::new(
		r#"
		//- /DRAFT - Epic - New.md
		---
		jira_key: ""
		---
		"#,
	);
	let mock = MockJiraClient::new();

	let err = ctx.sync(&mock, SyncOptions::default(), "DRAFT - Epic - New.md", push_file).unwrap_err();
	assert!(err.to_string().contains("run `jirasync create`"), "{err}");
	assert!(mock.call_log().is_empty());
}
