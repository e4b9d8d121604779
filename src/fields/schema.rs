//! Field ids of the deployed Jira instance, and which of them each kind may send.

use super::FieldSet;
use crate::record::{EntityKind, RecordError};

pub const CF_TEAM: &str = "customfield_10001";
pub const CF_SPRINT: &str = "customfield_10020";
/// Story → Feature link.
pub const CF_PARENT_LINK: &str = "customfield_10014";
pub const CF_PM_OWNER: &str = "customfield_10246";
pub const CF_STORY_POINTS_EPIC: &str = "customfield_10026";
pub const CF_STORY_POINTS_STORY: &str = "customfield_10037";
pub const CF_STORY_POINTS_SUBTASK: &str = "customfield_10016";
pub const CF_ACCEPTANCE: &str = "customfield_10256";
pub const CF_TECH_NOTES: &str = "customfield_10356";
pub const CF_QA_TEST: &str = "customfield_10462";
pub const CF_BUSINESS_PROBLEM: &str = "customfield_10255";
pub const CF_HIGH_LEVEL_SCOPE: &str = "customfield_10323";
pub const CF_SUCCESS_METRICS: &str = "customfield_10391";
pub const CF_PROBLEM_STATEMENT: &str = "customfield_10322";

pub const ISSUE_TYPE_EPIC: &str = "10186";
pub const ISSUE_TYPE_STORY: &str = "10007";
pub const ISSUE_TYPE_SUBTASK: &str = "10184";
pub const ISSUE_TYPE_FEATURE_NAME: &str = "Feature";

/// Wire shape of a field value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
pub enum Shape {
	Text,
	Int,
	Float,
	Labels,
	Key,
	Id,
	Name,
	Account,
	RichText,
}

/// A rich-text field together with the body section it is kept under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RichTextField {
	pub id: &'static str,
	pub section: &'static str,
}

const DESCRIPTION: RichTextField = RichTextField {
	id: "description",
	section: "Description",
};
const BUSINESS_PROBLEM: RichTextField = RichTextField {
	id: CF_BUSINESS_PROBLEM,
	section: "Business Problem (customfield_10255)",
};
const HIGH_LEVEL_SCOPE: RichTextField = RichTextField {
	id: CF_HIGH_LEVEL_SCOPE,
	section: "High-Level Scope (customfield_10323)",
};
const SUCCESS_METRICS: RichTextField = RichTextField {
	id: CF_SUCCESS_METRICS,
	section: "Success Metrics (customfield_10391)",
};
const TECH_NOTES: RichTextField = RichTextField {
	id: CF_TECH_NOTES,
	section: "Technical Notes (customfield_10356)",
};
const ACCEPTANCE: RichTextField = RichTextField {
	id: CF_ACCEPTANCE,
	section: "Acceptance Criteria",
};
const QA_TEST: RichTextField = RichTextField {
	id: CF_QA_TEST,
	section: "QA Test (customfield_10462)",
};

pub fn rich_text_fields(kind: EntityKind) -> &'static [RichTextField] {
	match kind {
		EntityKind::Epic => &[DESCRIPTION],
		EntityKind::Feature => &[DESCRIPTION, BUSINESS_PROBLEM, HIGH_LEVEL_SCOPE, SUCCESS_METRICS, TECH_NOTES],
		EntityKind::Story => &[ACCEPTANCE, TECH_NOTES],
		EntityKind::Subtask => &[ACCEPTANCE, TECH_NOTES, QA_TEST],
	}
}

pub fn story_points_field(kind: EntityKind) -> &'static str {
	match kind {
		EntityKind::Epic | EntityKind::Feature => CF_STORY_POINTS_EPIC,
		EntityKind::Story => CF_STORY_POINTS_STORY,
		EntityKind::Subtask => CF_STORY_POINTS_SUBTASK,
	}
}

/// Expected shape of `id` for `kind`, `None` if the kind never sends it.
pub fn shape_of(kind: EntityKind, id: &str) -> Option<Shape> {
	if rich_text_fields(kind).iter().any(|f| f.id == id) {
		return Some(Shape::RichText);
	}
	if id == story_points_field(kind) {
		return Some(Shape::Float);
	}
	let shape = match (kind, id) {
		(_, "project") => Shape::Key,
		(EntityKind::Feature, "issuetype") => Shape::Name,
		(_, "issuetype") => Shape::Id,
		(_, "summary") => Shape::Text,
		(_, "assignee") => Shape::Account,
		(_, "parent") if matches!(kind, EntityKind::Feature | EntityKind::Subtask) => Shape::Key,
		(EntityKind::Subtask, _) => return None,
		(_, "labels") => Shape::Labels,
		(_, CF_TEAM) => Shape::Text,
		(_, CF_SPRINT) => Shape::Int,
		(_, CF_PM_OWNER) => Shape::Account,
		(EntityKind::Story, CF_PARENT_LINK) => Shape::Text,
		(EntityKind::Epic, CF_PROBLEM_STATEMENT) => Shape::Text,
		_ => return None,
	};
	Some(shape)
}

/// Reject fields `kind` does not declare, and values of the wrong shape.
pub fn validate(kind: EntityKind, fields: &FieldSet) -> Result<(), RecordError> {
	for (id, value) in fields.iter() {
		match shape_of(kind, id) {
			None => return Err(RecordError::validation(format!("{kind} does not accept field '{id}'"))),
			Some(expected) if expected != value.shape() => {
				return Err(RecordError::validation(format!("{kind} field '{id}' must be {expected}, got {}", value.shape())));
			}
			Some(_) => {}
		}
	}
	Ok(())
}

/// Fields requested when pulling `kind`.
pub fn pull_projection(kind: EntityKind) -> Vec<&'static str> {
	let mut fields = vec!["summary", "status", "assignee"];
	match kind {
		EntityKind::Epic | EntityKind::Feature => {
			fields.extend(["reporter", "labels", "created", "updated", CF_TEAM, CF_SPRINT, CF_PM_OWNER]);
			if kind == EntityKind::Feature {
				fields.push("parent");
			}
		}
		EntityKind::Story => fields.extend(["labels", "parent", "created", "updated", CF_TEAM, CF_SPRINT, CF_PM_OWNER, CF_PARENT_LINK]),
		EntityKind::Subtask => fields.extend(["parent", "created", "updated"]),
	}
	fields.push(story_points_field(kind));
	fields.extend(rich_text_fields(kind).iter().map(|f| f.id));
	if kind == EntityKind::Epic {
		fields.push(CF_PROBLEM_STATEMENT);
	}
	fields
}
