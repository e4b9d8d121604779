//! `jirasync pull`: bring remote state into record files. Remote wins, local edits to pulled fields are lost.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

use super::{Outcome, SyncContext, file_name, load_record, write_atomic};
use crate::{
	fields::{RemoteSnapshot, pretty_json, schema},
	jira::JiraClient,
	record::{Document, Entity, EntityKind, Part, Placement, RecordError},
};

pub fn pull_file(ctx: &SyncContext, path: &Path) -> Result<Outcome> {
	let loaded = load_record(path, ctx.opts.kind)?;
	let record = &loaded.record;
	let primary = &record.primary;
	if primary.is_draft() {
		return Err(RecordError::validation(format!("Could not find jira_key for the {} in {}", primary.kind, path.display())).into());
	}
	let client = ctx.require_client()?;

	println!("\n{}:", file_name(path));
	println!("  {}: {}", primary.kind, primary.meta.key);
	let subtask = record.subtask.as_ref().filter(|s| !s.is_draft());
	if let Some(subtask) = subtask {
		println!("  Subtask: {}", subtask.meta.key);
	}

	let primary_snapshot = fetch(client, primary)?;
	let subtask_snapshot = subtask.map(|s| fetch(client, s)).transpose()?;

	if ctx.opts.dry_run {
		println!("  [dry-run] Would update local file with:");
		println!("{}", pretty_json(&serde_json::to_value(&primary_snapshot)?));
		if let Some(snapshot) = &subtask_snapshot {
			println!("{}", pretty_json(&serde_json::to_value(snapshot)?));
		}
		return Ok(Outcome::default());
	}

	let mut doc = Document::parse(&loaded.content);
	let part = primary.kind.part();
	apply_snapshot(&mut doc, primary.kind, part, &primary_snapshot);
	if let Some(snapshot) = &subtask_snapshot {
		apply_snapshot(&mut doc, EntityKind::Subtask, Some(Part::Subtask), snapshot);
	}

	let updated = doc.to_string();
	if updated == loaded.content {
		println!("  Local file already up to date");
		return Ok(Outcome::default());
	}
	write_atomic(path, &updated)?;
	tracing::info!(path = %path.display(), "pulled");
	println!("  ✓ Updated local file");
	Ok(Outcome::default())
}

fn fetch(client: &dyn JiraClient, entity: &Entity) -> Result<RemoteSnapshot> {
	let key = &entity.meta.key;
	let issue = client
		.fetch_issue(key, &schema::pull_projection(entity.kind))
		.wrap_err_with(|| format!("Error fetching {} {key}", entity.kind))?;
	let snapshot = RemoteSnapshot::from_issue(entity.kind, &issue);
	let assignee = if snapshot.assignee.is_empty() { "unassigned" } else { snapshot.assignee.as_str() };
	println!("  ✓ Fetched {}: status={}, assignee={assignee}", entity.kind, snapshot.status);
	Ok(snapshot)
}

/// Write everything a pull owns for one entity. `part` scopes the writes inside Story records.
pub fn apply_snapshot(doc: &mut Document, kind: EntityKind, part: Option<Part>, snapshot: &RemoteSnapshot) {
	let section = part.map(Part::section_key);
	let scope = part.map(Part::heading);

	let mut scalars: Vec<(&str, &str)> = vec![("status", snapshot.status.as_str()), ("assignee", snapshot.assignee.as_str())];
	if kind != EntityKind::Epic {
		scalars.push(("parent_key", snapshot.parent_key.as_str()));
	}
	scalars.push(("team_id", snapshot.team_id.as_str()));
	scalars.push(("sprint_id", snapshot.sprint_id.as_str()));
	scalars.push(("story_points", snapshot.story_points.as_str()));
	if kind != EntityKind::Subtask {
		scalars.push(("pm_owner", snapshot.pm_owner.as_str()));
	}
	scalars.push(("created_at", snapshot.created.as_str()));
	if matches!(kind, EntityKind::Epic | EntityKind::Feature) {
		scalars.push(("reporter", snapshot.reporter.as_str()));
		scalars.push(("updated_at", snapshot.updated.as_str()));
	}

	// New keys go right after the opening line, so insert backwards to keep them in order.
	if kind != EntityKind::Subtask {
		doc.set_list_field(section, "labels", &snapshot.labels);
	}
	for (key, value) in scalars.into_iter().rev() {
		doc.set_field(section, key, value);
	}

	for field in schema::rich_text_fields(kind) {
		if let Some(adf) = snapshot.rich_text.get(field.id) {
			doc.upsert_rich_text(scope, field.section, field.id, adf);
		}
	}

	if matches!(kind, EntityKind::Epic | EntityKind::Feature) && !snapshot.summary.is_empty() {
		doc.replace_section_body(None, "Summary", &snapshot.summary, Placement::Start);
	}
	if kind == EntityKind::Epic && !snapshot.problem_statement.is_empty() {
		doc.replace_section_body(None, "Problem Statement", &snapshot.problem_statement, Placement::After("Summary"));
	}
}
