//! Record entities → outgoing field sets.

use std::sync::LazyLock;

use color_eyre::eyre::Result;
use regex::Regex;

use super::{
	FieldSet, FieldValue, UserResolver,
	schema::{self, CF_PARENT_LINK, CF_PM_OWNER, CF_PROBLEM_STATEMENT, CF_SPRINT, CF_TEAM},
};
use crate::record::{Entity, EntityKind, SUMMARY_LIMIT, normalize_marks, truncate_chars};

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").expect("static regex"));

/// Integer only when the whole value is one.
pub fn parse_int(raw: &str) -> Option<i64> {
	let raw = raw.trim();
	INT_RE.is_match(raw).then(|| raw.parse().ok()).flatten()
}

/// Best-effort float; anything unparsable or non-finite is dropped.
pub fn parse_float(raw: &str) -> Option<f64> {
	raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Jira summaries are capped; longer ones keep their first 252 characters plus `...`.
pub fn truncate_summary(summary: &str) -> String {
	if summary.chars().count() > SUMMARY_LIMIT {
		format!("{}...", truncate_chars(summary, SUMMARY_LIMIT - 3))
	} else {
		summary.to_string()
	}
}

fn issue_type(kind: EntityKind) -> FieldValue {
	match kind {
		EntityKind::Epic => FieldValue::Id(schema::ISSUE_TYPE_EPIC.to_string()),
		EntityKind::Feature => FieldValue::Name(schema::ISSUE_TYPE_FEATURE_NAME.to_string()),
		EntityKind::Story => FieldValue::Id(schema::ISSUE_TYPE_STORY.to_string()),
		EntityKind::Subtask => FieldValue::Id(schema::ISSUE_TYPE_SUBTASK.to_string()),
	}
}

/// Labels, team, sprint, story points, PM owner and assignee: the planning fields
/// Epics, Features and Stories share.
fn put_planning_fields(fields: &mut FieldSet, entity: &Entity, users: &UserResolver) -> Result<()> {
	let meta = &entity.meta;
	if !meta.labels.is_empty() {
		fields.insert("labels", FieldValue::Labels(meta.labels.clone()));
	}
	if !meta.team_id.is_empty() {
		fields.insert(CF_TEAM, FieldValue::Text(meta.team_id.clone()));
	}
	if let Some(sprint) = parse_int(&meta.sprint_id) {
		fields.insert(CF_SPRINT, FieldValue::Int(sprint));
	}
	put_story_points(fields, entity.kind, &meta.story_points);
	if let Some(owner) = users.field_value(&meta.pm_owner)? {
		fields.insert(CF_PM_OWNER, owner);
	}
	put_assignee(fields, entity, users)
}

fn put_story_points(fields: &mut FieldSet, kind: EntityKind, raw: &str) {
	if let Some(points) = parse_float(raw) {
		fields.insert(schema::story_points_field(kind), FieldValue::Float(points));
	}
}

fn put_assignee(fields: &mut FieldSet, entity: &Entity, users: &UserResolver) -> Result<()> {
	if let Some(assignee) = users.field_value(&entity.meta.assignee)? {
		fields.insert("assignee", assignee);
	}
	Ok(())
}

fn put_rich_text<'a>(fields: &mut FieldSet, entity: &Entity, ids: impl IntoIterator<Item = &'a str>) {
	for id in ids {
		if let Some(doc) = entity.rich_text.get(id).filter(|doc| !doc.is_null()) {
			fields.insert(id, FieldValue::RichText(normalize_marks(doc)));
		}
	}
}

fn put_parent(fields: &mut FieldSet, parent_key: &str) {
	if !parent_key.is_empty() {
		fields.insert("parent", FieldValue::Key(parent_key.to_string()));
	}
}

/// Fields for creating `entity`.
///
/// `summary` is already resolved by the caller. `parent` overrides the entity's own parent key,
/// which is how a new Subtask learns the key of the Story created just before it.
/// `points_fallback` is used when the entity has no story points of its own.
pub fn create_fields(entity: &Entity, summary: &str, project_key: &str, parent: Option<&str>, points_fallback: Option<&str>, users: &UserResolver) -> Result<FieldSet> {
	let mut fields = FieldSet::new();
	fields.insert("project", FieldValue::Key(project_key.to_string()));
	fields.insert("issuetype", issue_type(entity.kind));
	fields.insert("summary", FieldValue::Text(truncate_summary(summary)));

	let parent_key = parent.unwrap_or(&entity.meta.parent_key);
	match entity.kind {
		EntityKind::Epic => {
			put_planning_fields(&mut fields, entity, users)?;
			put_rich_text(&mut fields, entity, ["description"]);
		}
		EntityKind::Feature => {
			put_parent(&mut fields, parent_key);
			put_planning_fields(&mut fields, entity, users)?;
			put_rich_text(&mut fields, entity, ["description"]);
		}
		EntityKind::Story => {
			if !parent_key.is_empty() {
				fields.insert(CF_PARENT_LINK, FieldValue::Text(parent_key.to_string()));
			}
			put_planning_fields(&mut fields, entity, users)?;
		}
		EntityKind::Subtask => {
			put_parent(&mut fields, parent_key);
			put_subtask_points(&mut fields, entity, points_fallback);
			put_assignee(&mut fields, entity, users)?;
		}
	}

	schema::validate(entity.kind, &fields)?;
	Ok(fields)
}

fn put_subtask_points(fields: &mut FieldSet, entity: &Entity, points_fallback: Option<&str>) {
	let own = entity.meta.story_points.as_str();
	let raw = if own.is_empty() { points_fallback.unwrap_or_default() } else { own };
	put_story_points(fields, entity.kind, raw);
}

/// Fields applied by a follow-up update right after creation.
pub fn followup_fields(entity: &Entity) -> Result<FieldSet> {
	let mut fields = FieldSet::new();
	match entity.kind {
		EntityKind::Epic => {
			if let Some(statement) = entity.problem_statement.as_deref().filter(|s| !s.is_empty()) {
				fields.insert(CF_PROBLEM_STATEMENT, FieldValue::Text(truncate_chars(statement, SUMMARY_LIMIT)));
			}
		}
		EntityKind::Feature => put_rich_text(&mut fields, entity, schema::rich_text_fields(entity.kind).iter().map(|f| f.id).filter(|id| *id != "description")),
		EntityKind::Story | EntityKind::Subtask => put_rich_text(&mut fields, entity, schema::rich_text_fields(entity.kind).iter().map(|f| f.id)),
	}
	schema::validate(entity.kind, &fields)?;
	Ok(fields)
}

/// Fields pushed for an existing issue.
pub fn update_fields(entity: &Entity, points_fallback: Option<&str>, users: &UserResolver) -> Result<FieldSet> {
	let mut fields = FieldSet::new();
	let rich_text_ids = schema::rich_text_fields(entity.kind).iter().map(|f| f.id);

	match entity.kind {
		EntityKind::Epic => {
			if let Some(summary) = &entity.summary {
				fields.insert("summary", FieldValue::Text(truncate_summary(summary)));
			}
			put_planning_fields(&mut fields, entity, users)?;
			put_rich_text(&mut fields, entity, rich_text_ids);
			if let Some(statement) = entity.problem_statement.as_deref().filter(|s| !s.is_empty()) {
				fields.insert(CF_PROBLEM_STATEMENT, FieldValue::Text(truncate_chars(statement, SUMMARY_LIMIT)));
			}
		}
		EntityKind::Feature => {
			if let Some(summary) = &entity.summary {
				fields.insert("summary", FieldValue::Text(truncate_summary(summary)));
			}
			put_parent(&mut fields, &entity.meta.parent_key);
			put_planning_fields(&mut fields, entity, users)?;
			put_rich_text(&mut fields, entity, rich_text_ids);
		}
		EntityKind::Story => {
			put_planning_fields(&mut fields, entity, users)?;
			put_rich_text(&mut fields, entity, rich_text_ids);
		}
		EntityKind::Subtask => {
			put_parent(&mut fields, &entity.meta.parent_key);
			put_subtask_points(&mut fields, entity, points_fallback);
			put_assignee(&mut fields, entity, users)?;
			put_rich_text(&mut fields, entity, rich_text_ids);
		}
	}

	schema::validate(entity.kind, &fields)?;
	Ok(fields)
}
