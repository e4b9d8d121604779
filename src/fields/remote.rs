//! Jira issue → local field values, for pulls.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::schema::{self, CF_PARENT_LINK, CF_PM_OWNER, CF_PROBLEM_STATEMENT, CF_SPRINT, CF_TEAM};
use crate::{jira::RemoteIssue, record::EntityKind};

/// What a pull writes back, as plain strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RemoteSnapshot {
	pub key: String,
	pub summary: String,
	pub status: String,
	pub assignee: String,
	pub reporter: String,
	pub created: String,
	pub updated: String,
	pub parent_key: String,
	pub team_id: String,
	pub sprint_id: String,
	pub story_points: String,
	pub pm_owner: String,
	pub labels: Vec<String>,
	pub rich_text: BTreeMap<String, Value>,
	pub problem_statement: String,
}

fn str_at<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a str> {
	value?.get(key)?.as_str()
}

/// Email if Jira exposes it, else the account id.
fn person(value: Option<&Value>) -> String {
	str_at(value, "emailAddress")
		.filter(|s| !s.is_empty())
		.or_else(|| str_at(value, "accountId"))
		.unwrap_or_default()
		.to_string()
}

/// Render a JSON scalar the way it should appear in front matter.
/// Integers stay integers, floats always carry a fraction.
fn scalar_string(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Number(n) if n.is_f64() => n.as_f64().map(|f| if f.fract() == 0.0 { format!("{f:.1}") } else { f.to_string() }).unwrap_or_default(),
		Value::Number(n) => n.to_string(),
		Value::Bool(b) => b.to_string(),
		_ => String::new(),
	}
}

fn id_of(value: Option<&Value>) -> String {
	match value {
		Some(Value::Object(map)) => map.get("id").map(scalar_string).unwrap_or_default(),
		Some(other) => scalar_string(other),
		None => String::new(),
	}
}

fn sprint_id(value: Option<&Value>) -> String {
	match value {
		Some(Value::Array(sprints)) => id_of(sprints.first()),
		other => id_of(other),
	}
}

impl RemoteSnapshot {
	pub fn from_issue(kind: EntityKind, issue: &RemoteIssue) -> Self {
		let field = |id: &str| issue.fields.get(id).filter(|v| !v.is_null());

		let parent_key = str_at(field("parent"), "key")
			.map(str::to_string)
			.or_else(|| field(CF_PARENT_LINK).map(scalar_string))
			.unwrap_or_default();

		let labels = field("labels")
			.and_then(Value::as_array)
			.map(|labels| labels.iter().filter_map(Value::as_str).map(str::to_string).collect())
			.unwrap_or_default();

		let rich_text = schema::rich_text_fields(kind)
			.iter()
			.filter_map(|f| field(f.id).map(|doc| (f.id.to_string(), doc.clone())))
			.collect();

		Self {
			key: issue.key.clone(),
			summary: field("summary").map(scalar_string).unwrap_or_default(),
			status: str_at(field("status"), "name").unwrap_or_default().to_string(),
			assignee: person(field("assignee")),
			reporter: person(field("reporter")),
			created: field("created").map(scalar_string).unwrap_or_default(),
			updated: field("updated").map(scalar_string).unwrap_or_default(),
			parent_key,
			team_id: id_of(field(CF_TEAM)),
			sprint_id: sprint_id(field(CF_SPRINT)),
			story_points: field(schema::story_points_field(kind)).map(scalar_string).unwrap_or_default(),
			pm_owner: person(field(CF_PM_OWNER)),
			labels,
			rich_text,
			problem_statement: field(CF_PROBLEM_STATEMENT).map(scalar_string).unwrap_or_default(),
		}
	}
}
