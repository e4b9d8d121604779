//! `jirasync create`: turn draft records into Jira issues.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};

use super::{LoadedRecord, Outcome, SyncContext, file_name, files, load_record, write_atomic};
use crate::{
	fields::{FieldSet, UserResolver, create_fields, followup_fields},
	jira::JiraClient,
	record::{Document, Entity, EntityKind, Part, RecordError, RecordKind},
};

/// Summary for a new issue: body content, else the title in the file name, else `<Kind> for <parent>`.
pub fn resolve_summary(entity: &Entity, path: Option<&Path>, parent: &str) -> Result<String, RecordError> {
	if let Some(summary) = entity.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
		return Ok(summary.to_string());
	}
	if let Some(title) = path.map(files::title_from_filename).filter(|t| !t.is_empty()) {
		return Ok(title);
	}
	if entity.kind != EntityKind::Epic && !parent.is_empty() {
		return Ok(format!("{} for {parent}", entity.kind));
	}
	Err(RecordError::validation(format!(
		"{} has no summary: add a `## Summary` section or give the file a title",
		entity.kind
	)))
}

pub fn create_file(ctx: &SyncContext, path: &Path) -> Result<Outcome> {
	let loaded = load_record(path, ctx.opts.kind)?;
	let record = &loaded.record;
	println!("\n{}:", file_name(path));

	if !record.primary.is_draft() {
		println!("  {}: {} (already exists, skipping)", record.primary.kind, record.primary.meta.key);
		if let Some(subtask) = record.subtask.as_ref().filter(|s| !s.is_draft()) {
			println!("  Subtask: {} (already exists, skipping)", subtask.meta.key);
		}
		return Ok(Outcome::skipped());
	}

	let client = if ctx.opts.dry_run { ctx.client } else { Some(ctx.require_client()?) };
	let users = ctx.users();

	let primary = &record.primary;
	let summary = resolve_summary(primary, Some(path), &primary.meta.parent_key)?;
	let fields = create_fields(primary, &summary, &ctx.project_key, None, None, &users)?;
	let followup = followup_fields(primary)?;

	println!("  Creating {}...", primary.kind);
	let Some(client) = client.filter(|_| !ctx.opts.dry_run) else {
		print_dry_run(primary.kind, &fields, &followup);
		if record.subtask.as_ref().is_some_and(Entity::is_draft) {
			println!("  [dry-run] Subtask would be created after the Story, with the new Story key as parent");
		}
		return Ok(Outcome::default());
	};

	let mut outcome = Outcome::default();
	let key = create_issue(client, primary.kind, &fields)?;
	apply_followup(client, &key, &followup, &mut outcome);

	let subtask_key = match record.subtask.as_ref().filter(|s| s.is_draft()) {
		Some(subtask) => create_subtask(client, ctx, &users, subtask, &key, &primary.meta.story_points, &mut outcome),
		None => None,
	};

	write_keys(&loaded, &key, subtask_key.as_deref()).wrap_err_with(|| format!("Created {key}, but could not record it locally"))?;
	println!("  ✓ Updated local file with jira_key: {key}");

	match files::rename_draft(path, &key) {
		Ok(Some(new_path)) => println!("  ✓ Renamed file: {} -> {}", file_name(path), file_name(&new_path)),
		Ok(None) => {}
		Err(e) => outcome.warn(format!("{e:#}")),
	}
	Ok(outcome)
}

fn print_dry_run(kind: EntityKind, fields: &FieldSet, followup: &FieldSet) {
	println!("  [dry-run] Would create {kind} with fields:");
	println!("{}", fields.to_pretty_string());
	if !followup.is_empty() {
		println!("  [dry-run] Would update additional fields:");
		println!("{}", followup.to_pretty_string());
	}
}

fn create_issue(client: &dyn JiraClient, kind: EntityKind, fields: &FieldSet) -> Result<String> {
	let created = client.create_issue(fields).wrap_err_with(|| format!("Failed to create {kind}"))?;
	if created.key.is_empty() {
		bail!("Failed to create {kind}: no key returned");
	}
	tracing::info!(%kind, key = %created.key, id = %created.id, "created issue");
	println!("  ✓ Created {kind}: {}", created.key);
	Ok(created.key)
}

/// Fields that can only be set once the issue exists. Failing here leaves a usable issue, so it only warns.
fn apply_followup(client: &dyn JiraClient, key: &str, followup: &FieldSet, outcome: &mut Outcome) {
	if followup.is_empty() {
		return;
	}
	match client.update_issue(key, followup) {
		Ok(()) => println!("  ✓ Updated additional fields: {key}"),
		Err(e) => outcome.warn(format!("Failed to update additional fields of {key}: {e}")),
	}
}

/// The Story exists at this point, so nothing here fails the record.
fn create_subtask(client: &dyn JiraClient, ctx: &SyncContext, users: &UserResolver, subtask: &Entity, story_key: &str, story_points: &str, outcome: &mut Outcome) -> Option<String> {
	println!("  Creating Subtask...");
	let prepared = resolve_summary(subtask, None, story_key)
		.map_err(Into::into)
		.and_then(|summary| create_fields(subtask, &summary, &ctx.project_key, Some(story_key), Some(story_points), users))
		.and_then(|fields| Ok((fields, followup_fields(subtask)?)));
	let (fields, followup) = match prepared {
		Ok(prepared) => prepared,
		Err(e) => {
			outcome.warn(format!("Failed to create Subtask: {e:#}"));
			return None;
		}
	};

	match create_issue(client, EntityKind::Subtask, &fields) {
		Ok(key) => {
			apply_followup(client, &key, &followup, outcome);
			Some(key)
		}
		Err(e) => {
			outcome.warn(format!("{e:#}"));
			None
		}
	}
}

fn write_keys(loaded: &LoadedRecord, key: &str, subtask_key: Option<&str>) -> Result<()> {
	let mut doc = Document::parse(&loaded.content);
	match loaded.record.kind {
		RecordKind::Epic | RecordKind::Feature => {
			doc.set_field(None, "jira_key", key);
		}
		RecordKind::Story => {
			doc.set_field(Some(Part::UserStory.section_key()), "jira_key", key);
			if let Some(subtask_key) = subtask_key {
				doc.set_field(Some(Part::Subtask.section_key()), "jira_key", subtask_key);
				doc.set_field(Some(Part::Subtask.section_key()), "parent_key", key);
			}
		}
	}
	write_atomic(&loaded.path, &doc.to_string())
}
