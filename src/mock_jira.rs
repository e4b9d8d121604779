//! Mock Jira client for testing purposes.
//!
//! Stores issues, users and a workflow in memory, implements [`JiraClient`] on top of them,
//! and records every call so tests can assert on the traffic.

use std::{
	collections::BTreeMap,
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use serde_json::{Map, Value, json};

use crate::{
	fields::FieldSet,
	jira::{CreatedIssue, JiraClient, JiraError, JiraUser, RemoteIssue, Transition, TransitionTarget},
};

const INITIAL_STATUS: &str = "To Do";

/// A scripted failure for updates of one issue.
#[derive(Clone, Debug)]
struct UpdateRejection {
	key: String,
	/// Only updates carrying this field fail. `None` fails every update.
	field: Option<String>,
	status: u16,
	body: String,
}

#[derive(Clone, Debug)]
struct CreateRejection {
	/// Issue type id or name the rejection applies to.
	issue_type: String,
	status: u16,
	body: String,
}

/// Mock Jira client that stores all state in memory.
pub struct MockJiraClient {
	next_issue_number: AtomicU64,
	next_issue_id: AtomicU64,
	issues: Mutex<BTreeMap<String, Map<String, Value>>>,
	users: Mutex<Vec<JiraUser>>,
	/// (id, name, destination status), offered from every status but the destination itself.
	workflow: Mutex<Vec<(String, String, String)>>,
	update_rejections: Mutex<Vec<UpdateRejection>>,
	create_rejections: Mutex<Vec<CreateRejection>>,
	/// Call log for assertions
	call_log: Mutex<Vec<String>>,
}

impl Default for MockJiraClient {
	fn default() -> Self {
		Self::new()
	}
}

impl MockJiraClient {
	pub fn new() -> Self {
		let client = Self {
			next_issue_number: AtomicU64::new(100),
			next_issue_id: AtomicU64::new(10_000),
			issues: Mutex::new(BTreeMap::new()),
			users: Mutex::new(Vec::new()),
			workflow: Mutex::new(vec![
				("11".into(), "Reopen".into(), "To Do".into()),
				("21".into(), "Start Progress".into(), "In Progress".into()),
				("31".into(), "Resolve".into(), "Done".into()),
			]),
			update_rejections: Mutex::new(Vec::new()),
			create_rejections: Mutex::new(Vec::new()),
			call_log: Mutex::new(Vec::new()),
		};

		// Load initial state from file if JIRASYNC_MOCK_STATE is set
		#[cfg(feature = "is_integration_test")]
		if let Ok(state_file) = std::env::var("JIRASYNC_MOCK_STATE")
			&& let Ok(content) = std::fs::read_to_string(&state_file)
		{
			if let Err(e) = client.load_state_json(&content) {
				eprintln!("[mock] Failed to load state from {state_file}: {e}");
			} else {
				eprintln!("[mock] Loaded state from {state_file}");
			}
		}

		client
	}

	/// Load issues and users from JSON:
	/// `{"issues": [{"key": "WOR-1", "fields": {..}}], "users": [{"accountId": .., "emailAddress": ..}]}`
	pub fn load_state_json(&self, content: &str) -> Result<(), String> {
		let state: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

		if let Some(issues) = state.get("issues").and_then(|v| v.as_array()) {
			for issue in issues {
				let key = issue.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
				let fields = issue.get("fields").cloned().unwrap_or_else(|| json!({}));
				self.add_issue(key, fields);
			}
		}

		if let Some(users) = state.get("users").and_then(|v| v.as_array()) {
			for user in users {
				let user: JiraUser = serde_json::from_value(user.clone()).map_err(|e| e.to_string())?;
				self.users.lock().unwrap().push(user);
			}
		}

		Ok(())
	}

	/// Add an issue. Without a `status` field it starts in "To Do".
	pub fn add_issue(&self, key: &str, fields: Value) {
		let mut fields = fields.as_object().cloned().unwrap_or_default();
		fields.entry("status").or_insert_with(|| json!({ "name": INITIAL_STATUS }));
		self.issues.lock().unwrap().insert(key.to_string(), fields);
	}

	pub fn add_user(&self, account_id: &str, email: Option<&str>) {
		self.users.lock().unwrap().push(JiraUser {
			account_id: Some(account_id.to_string()),
			email_address: email.map(str::to_string),
			display_name: None,
		});
	}

	/// Replace the workflow: `(transition id, transition name, destination status)`.
	pub fn set_workflow(&self, transitions: &[(&str, &str, &str)]) {
		*self.workflow.lock().unwrap() = transitions.iter().map(|(id, name, to)| (id.to_string(), name.to_string(), to.to_string())).collect();
	}

	/// Fail updates of `key` that carry `field` (or every update, if `None`).
	pub fn reject_update(&self, key: &str, field: Option<&str>, status: u16, body: &str) {
		self.update_rejections.lock().unwrap().push(UpdateRejection {
			key: key.to_string(),
			field: field.map(str::to_string),
			status,
			body: body.to_string(),
		});
	}

	/// Fail creation of issues of the given type id or name.
	pub fn reject_create(&self, issue_type: &str, status: u16, body: &str) {
		self.create_rejections.lock().unwrap().push(CreateRejection {
			issue_type: issue_type.to_string(),
			status,
			body: body.to_string(),
		});
	}

	/// Stored fields of an issue.
	pub fn issue(&self, key: &str) -> Option<Map<String, Value>> {
		self.issues.lock().unwrap().get(key).cloned()
	}

	pub fn status_of(&self, key: &str) -> Option<String> {
		self.issue(key).and_then(|fields| fields.get("status")?.get("name")?.as_str().map(str::to_string))
	}

	/// Get the call log
	pub fn call_log(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	/// Clear the call log
	pub fn clear_call_log(&self) {
		self.call_log.lock().unwrap().clear();
	}

	fn log_call(&self, call: String) {
		tracing::info!(target: "mock_jira", "{call}");
		self.call_log.lock().unwrap().push(call);
	}

	fn not_found(method: &str, path: String) -> JiraError {
		JiraError::Api {
			method: method.to_string(),
			path,
			status: 404,
			body: r#"{"errorMessages":["Issue does not exist or you do not have permission to see it."],"errors":{}}"#.to_string(),
		}
	}
}

impl JiraClient for MockJiraClient {
	fn create_issue(&self, fields: &FieldSet) -> Result<CreatedIssue, JiraError> {
		let payload = fields.to_json();
		let issue_type = payload.get("issuetype").and_then(|t| t.get("id").or_else(|| t.get("name"))).and_then(Value::as_str).unwrap_or_default().to_string();
		self.log_call(format!("create_issue {issue_type}"));

		if let Some(rejection) = self.create_rejections.lock().unwrap().iter().find(|r| r.issue_type == issue_type) {
			return Err(JiraError::Api {
				method: "POST".into(),
				path: "/rest/api/3/issue".into(),
				status: rejection.status,
				body: rejection.body.clone(),
			});
		}

		let project = payload.get("project").and_then(|p| p.get("key")).and_then(Value::as_str).unwrap_or("WOR");
		let key = format!("{project}-{}", self.next_issue_number.fetch_add(1, Ordering::SeqCst));
		let id = self.next_issue_id.fetch_add(1, Ordering::SeqCst).to_string();
		self.add_issue(&key, payload);
		Ok(CreatedIssue { key, id })
	}

	fn fetch_issue(&self, key: &str, fields: &[&str]) -> Result<RemoteIssue, JiraError> {
		self.log_call(format!("fetch_issue {key}"));
		let stored = self.issue(key).ok_or_else(|| Self::not_found("GET", format!("/rest/api/3/issue/{key}")))?;
		let fields = if fields.is_empty() {
			stored
		} else {
			stored.into_iter().filter(|(id, _)| fields.contains(&id.as_str())).collect()
		};
		Ok(RemoteIssue { key: key.to_string(), fields })
	}

	fn update_issue(&self, key: &str, fields: &FieldSet) -> Result<(), JiraError> {
		let ids: Vec<&str> = fields.iter().map(|(id, _)| id).collect();
		self.log_call(format!("update_issue {key} [{}]", ids.join(", ")));
		let path = format!("/rest/api/3/issue/{key}");

		let rejection = self
			.update_rejections
			.lock()
			.unwrap()
			.iter()
			.find(|r| r.key == key && r.field.as_deref().is_none_or(|f| fields.contains(f)))
			.cloned();
		if let Some(rejection) = rejection {
			return Err(JiraError::Api {
				method: "PUT".into(),
				path,
				status: rejection.status,
				body: rejection.body,
			});
		}

		let mut issues = self.issues.lock().unwrap();
		let stored = issues.get_mut(key).ok_or_else(|| Self::not_found("PUT", path))?;
		if let Value::Object(update) = fields.to_json() {
			stored.extend(update);
		}
		Ok(())
	}

	fn transitions(&self, key: &str) -> Result<Vec<Transition>, JiraError> {
		self.log_call(format!("transitions {key}"));
		let current = self.status_of(key).ok_or_else(|| Self::not_found("GET", format!("/rest/api/3/issue/{key}/transitions")))?;
		Ok(self
			.workflow
			.lock()
			.unwrap()
			.iter()
			.filter(|(_, _, to)| *to != current)
			.map(|(id, name, to)| Transition {
				id: id.clone(),
				name: name.clone(),
				to: Some(TransitionTarget { name: to.clone() }),
			})
			.collect())
	}

	fn transition(&self, key: &str, transition_id: &str) -> Result<(), JiraError> {
		self.log_call(format!("transition {key} {transition_id}"));
		let path = format!("/rest/api/3/issue/{key}/transitions");
		let destination = self
			.workflow
			.lock()
			.unwrap()
			.iter()
			.find(|(id, _, _)| id == transition_id)
			.map(|(_, _, to)| to.clone())
			.ok_or_else(|| JiraError::Api {
				method: "POST".into(),
				path: path.clone(),
				status: 400,
				body: format!(r#"{{"errorMessages":["Transition id '{transition_id}' is not valid for this issue."]}}"#),
			})?;

		let mut issues = self.issues.lock().unwrap();
		let stored = issues.get_mut(key).ok_or_else(|| Self::not_found("POST", path))?;
		stored.insert("status".into(), json!({ "name": destination }));
		Ok(())
	}

	fn search_users(&self, query: &str) -> Result<Vec<JiraUser>, JiraError> {
		self.log_call(format!("search_users {query}"));
		let needle = query.to_lowercase();
		Ok(self
			.users
			.lock()
			.unwrap()
			.iter()
			.filter(|u| {
				[&u.email_address, &u.display_name, &u.account_id]
					.into_iter()
					.flatten()
					.any(|s| s.to_lowercase().contains(&needle))
			})
			.take(20)
			.cloned()
			.collect())
	}
}
