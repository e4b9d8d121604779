//! `jirasync push`: send local edits of existing issues to Jira.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

use super::{Outcome, SyncContext, file_name, load_record, transition};
use crate::{
	fields::{FieldSet, schema::CF_SPRINT, update_fields},
	jira::JiraClient,
	record::{Entity, EntityKind, RecordError},
};

/// Jira's complaint when the sprint in a record has been closed.
const CLOSED_SPRINT: &str = "can be assigned only active or future sprints";

/// The field to drop for one retry after `message`, if any.
fn retry_without(kind: EntityKind, message: &str, fields: &FieldSet) -> Option<&'static str> {
	if message.contains(CLOSED_SPRINT) && fields.contains(CF_SPRINT) {
		return Some(CF_SPRINT);
	}
	if kind == EntityKind::Subtask && (message.contains("parent") || message.contains("Parent")) && fields.contains("parent") {
		return Some("parent");
	}
	None
}

fn retry_label(field: &str) -> &str {
	match field {
		CF_SPRINT => "sprint",
		other => other,
	}
}

pub fn push_file(ctx: &SyncContext, path: &Path) -> Result<Outcome> {
	let loaded = load_record(path, ctx.opts.kind)?;
	let record = &loaded.record;
	let primary = &record.primary;
	if primary.is_draft() {
		return Err(RecordError::validation(format!("{} has no jira_key; run `jirasync create` on it first", primary.kind)).into());
	}
	let client = if ctx.opts.dry_run { ctx.client } else { Some(ctx.require_client()?) };
	let users = ctx.users();

	let subtask = record.subtask.as_ref().filter(|s| !s.is_draft());
	let primary_fields = update_fields(primary, None, &users)?;
	let subtask_fields = subtask.map(|s| update_fields(s, Some(&primary.meta.story_points), &users)).transpose()?;

	println!("\n{}:", file_name(path));
	println!("  {}: {}", primary.kind, primary.meta.key);
	if primary.kind == EntityKind::Story {
		match subtask {
			Some(s) => println!("  Subtask: {}", s.meta.key),
			None => println!("  Subtask: (none - skipping subtask updates)"),
		}
	}

	let mut outcome = Outcome::default();
	match client.filter(|_| !ctx.opts.dry_run) {
		None => {
			println!("  [dry-run] {} field updates:", primary.kind);
			println!("{}", primary_fields.to_pretty_string());
			match (subtask, &subtask_fields) {
				(Some(_), Some(fields)) => {
					println!("  [dry-run] Subtask field updates:");
					println!("{}", fields.to_pretty_string());
				}
				_ if primary.kind == EntityKind::Story => println!("  [dry-run] Subtask: skipped (no jira_key)"),
				_ => {}
			}
		}
		Some(client) => {
			update_entity(client, primary, &primary_fields, &mut outcome)?;
			if let (Some(subtask), Some(fields)) = (subtask, &subtask_fields) {
				update_entity(client, subtask, fields, &mut outcome)?;
			}
		}
	}

	if ctx.opts.transition {
		match ctx.client {
			None => outcome.warn("Skipping transitions: Jira env vars not set."),
			Some(client) => {
				for entity in std::iter::once(primary).chain(subtask) {
					let desired = entity.meta.status.trim();
					if desired.is_empty() {
						continue;
					}
					if let Err(e) = transition::ensure_status(client, &entity.meta.key, desired, ctx.opts.dry_run) {
						outcome.warn(format!("{} transition: {e}", entity.kind));
					}
				}
			}
		}
	}

	Ok(outcome)
}

/// Update one issue, retrying once without a field Jira rejected for a known reason.
fn update_entity(client: &dyn JiraClient, entity: &Entity, fields: &FieldSet, outcome: &mut Outcome) -> Result<()> {
	let (kind, key) = (entity.kind, entity.meta.key.as_str());
	if fields.is_empty() {
		println!("  No {kind} fields to update: {key}");
		return Ok(());
	}

	let err = match client.update_issue(key, fields) {
		Ok(()) => {
			tracing::info!(%kind, key, fields = fields.len(), "updated issue");
			println!("  ✓ Updated {kind} fields: {key}");
			return Ok(());
		}
		Err(e) => e,
	};

	let Some(dropped) = retry_without(kind, &err.to_string(), fields) else {
		return Err(err).wrap_err_with(|| format!("Failed to update {kind} {key}"));
	};
	let label = retry_label(dropped);
	outcome.warn(format!("{kind} {key}: {label} rejected, retrying without {label}"));
	client.update_issue(key, &fields.without(dropped)).wrap_err_with(|| format!("Failed to update {kind} {key}"))?;
	println!("  ✓ Updated {kind} fields (without {label}): {key}");
	Ok(())
}
