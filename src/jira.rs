//! Jira REST v3 client.

use std::time::Duration;

use base64::Engine as _;
use reqwest::{Method, blocking::Client};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use url::Url;

use crate::{config::Credentials, fields::FieldSet};

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
	#[error("Jira API {method} {path} failed: HTTP {status}\n{body}")]
	Api { method: String, path: String, status: u16, body: String },
	#[error("Jira API {method} {path} failed: {source}")]
	Transport {
		method: String,
		path: String,
		#[source]
		source: reqwest::Error,
	},
	#[error("unexpected response from {path}: {source}")]
	Decode {
		path: String,
		#[source]
		source: serde_json::Error,
	},
	#[error("Missing required env var: {0}")]
	MissingCredentials(&'static str),
	#[error("invalid JIRA_BASE_URL {url:?}: {source}")]
	InvalidBaseUrl {
		url: String,
		#[source]
		source: url::ParseError,
	},
}

/// Response to issue creation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreatedIssue {
	#[serde(default)]
	pub key: String,
	#[serde(default)]
	pub id: String,
}

/// An issue as fetched, with only the requested fields.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RemoteIssue {
	pub key: String,
	#[serde(default)]
	pub fields: Map<String, Value>,
}

impl RemoteIssue {
	pub fn status(&self) -> &str {
		self.fields.get("status").and_then(|s| s.get("name")).and_then(Value::as_str).unwrap_or_default()
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransitionTarget {
	pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Transition {
	pub id: String,
	pub name: String,
	pub to: Option<TransitionTarget>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
	pub account_id: Option<String>,
	pub email_address: Option<String>,
	pub display_name: Option<String>,
}

#[derive(Deserialize)]
struct TransitionsResponse {
	#[serde(default)]
	transitions: Vec<Transition>,
}

/// Trait for Jira operations, allowing mock implementations for testing.
pub trait JiraClient {
	fn create_issue(&self, fields: &FieldSet) -> Result<CreatedIssue, JiraError>;

	/// Fetch an issue, limited to `fields`.
	fn fetch_issue(&self, key: &str, fields: &[&str]) -> Result<RemoteIssue, JiraError>;

	fn update_issue(&self, key: &str, fields: &FieldSet) -> Result<(), JiraError>;

	fn transitions(&self, key: &str) -> Result<Vec<Transition>, JiraError>;

	fn transition(&self, key: &str, transition_id: &str) -> Result<(), JiraError>;

	/// Search users by email or name. At most 20 results.
	fn search_users(&self, query: &str) -> Result<Vec<JiraUser>, JiraError>;
}

//==============================================================================
// Real Jira Client Implementation
//==============================================================================

/// Real Jira API client that makes HTTP requests
pub struct RealJiraClient {
	http_client: Client,
	base_url: Url,
	auth_header: String,
}

impl RealJiraClient {
	pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self, JiraError> {
		let http_client = Client::builder().timeout(timeout).build().map_err(|source| JiraError::Transport {
			method: "INIT".to_string(),
			path: credentials.base_url.to_string(),
			source,
		})?;
		let token = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", credentials.email, credentials.api_token));
		Ok(Self {
			http_client,
			base_url: credentials.base_url.clone(),
			auth_header: format!("Basic {token}"),
		})
	}

	fn url(&self, path: &str, query: &[(&str, &str)]) -> Url {
		let mut url = self.base_url.clone();
		let base_path = url.path().trim_end_matches('/').to_string();
		url.set_path(&format!("{base_path}{path}"));
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}
		url
	}

	/// Send a request and decode the JSON body. An empty body decodes as `null`.
	fn request<T: DeserializeOwned>(&self, method: Method, path: &str, query: &[(&str, &str)], body: Option<Value>) -> Result<T, JiraError> {
		let url = self.url(path, query);
		tracing::debug!(%method, %url, "jira request");

		let mut request = self
			.http_client
			.request(method.clone(), url)
			.header("Authorization", &self.auth_header)
			.header("Accept", "application/json");
		if let Some(body) = &body {
			request = request.json(body);
		}

		let transport = |source: reqwest::Error| JiraError::Transport {
			method: method.to_string(),
			path: path.to_string(),
			source,
		};
		let res = request.send().map_err(transport)?;
		let status = res.status();
		let text = res.text().map_err(transport)?;
		tracing::debug!(%status, body_len = text.len(), "jira response");

		if !status.is_success() {
			return Err(JiraError::Api {
				method: method.to_string(),
				path: path.to_string(),
				status: status.as_u16(),
				body: text,
			});
		}

		let text = if text.trim().is_empty() { "null" } else { text.as_str() };
		serde_json::from_str(text).map_err(|source| JiraError::Decode { path: path.to_string(), source })
	}
}

impl JiraClient for RealJiraClient {
	fn create_issue(&self, fields: &FieldSet) -> Result<CreatedIssue, JiraError> {
		self.request(Method::POST, "/rest/api/3/issue", &[], Some(json!({ "fields": fields })))
	}

	fn fetch_issue(&self, key: &str, fields: &[&str]) -> Result<RemoteIssue, JiraError> {
		let joined = fields.join(",");
		let query: Vec<(&str, &str)> = if fields.is_empty() { vec![] } else { vec![("fields", joined.as_str())] };
		self.request(Method::GET, &format!("/rest/api/3/issue/{key}"), &query, None)
	}

	fn update_issue(&self, key: &str, fields: &FieldSet) -> Result<(), JiraError> {
		self.request::<Value>(Method::PUT, &format!("/rest/api/3/issue/{key}"), &[], Some(json!({ "fields": fields })))
			.map(|_| ())
	}

	fn transitions(&self, key: &str) -> Result<Vec<Transition>, JiraError> {
		let res: TransitionsResponse = self.request(Method::GET, &format!("/rest/api/3/issue/{key}/transitions"), &[], None)?;
		Ok(res.transitions)
	}

	fn transition(&self, key: &str, transition_id: &str) -> Result<(), JiraError> {
		self.request::<Value>(
			Method::POST,
			&format!("/rest/api/3/issue/{key}/transitions"),
			&[],
			Some(json!({ "transition": { "id": transition_id } })),
		)
		.map(|_| ())
	}

	fn search_users(&self, query: &str) -> Result<Vec<JiraUser>, JiraError> {
		let users: Option<Vec<JiraUser>> = self.request(Method::GET, "/rest/api/3/user/search", &[("query", query), ("maxResults", "20")], None)?;
		Ok(users.unwrap_or_default())
	}
}
