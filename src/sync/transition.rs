//! Moving an issue to a named status through the workflow.

use crate::jira::{JiraClient, JiraError, Transition};

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
	#[error("No available transition for {key}: '{current}' -> '{desired}'. Available: {available:?}")]
	NoTransition {
		key: String,
		current: String,
		desired: String,
		available: Vec<String>,
	},
	#[error(transparent)]
	Jira(#[from] JiraError),
}

/// What happened, or would happen in simulate mode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransitionOutcome {
	AlreadyThere,
	Applied { from: String, to: String, transition_id: String },
	Simulated { from: String, to: String, transition_id: String },
}

/// Transition whose destination is `desired`, else one named `desired`.
fn pick<'t>(transitions: &'t [Transition], desired: &str) -> Option<&'t Transition> {
	transitions
		.iter()
		.find(|t| t.to.as_ref().is_some_and(|to| to.name == desired))
		.or_else(|| transitions.iter().find(|t| t.name == desired))
}

/// Move `key` from `current` to `desired`. No calls at all when they already match.
pub fn apply(client: &dyn JiraClient, key: &str, current: &str, desired: &str, simulate: bool) -> Result<TransitionOutcome, TransitionError> {
	let desired = desired.trim();
	let current = current.trim();
	if current == desired {
		return Ok(TransitionOutcome::AlreadyThere);
	}

	let transitions = client.transitions(key)?;
	let Some(transition) = pick(&transitions, desired) else {
		return Err(TransitionError::NoTransition {
			key: key.to_string(),
			current: current.to_string(),
			desired: desired.to_string(),
			available: transitions.iter().filter_map(|t| t.to.as_ref().map(|to| to.name.clone())).collect(),
		});
	};

	let (from, to, transition_id) = (current.to_string(), desired.to_string(), transition.id.clone());
	if simulate {
		println!("  [dry-run] Would transition {key}: {from} -> {to} (transition {transition_id})");
		return Ok(TransitionOutcome::Simulated { from, to, transition_id });
	}

	client.transition(key, &transition_id)?;
	tracing::info!(key, %from, %to, "transitioned");
	println!("  ✓ Transitioned {key}: {from} -> {to}");
	Ok(TransitionOutcome::Applied { from, to, transition_id })
}

/// Fetch the current status of `key`, then [`apply`].
pub fn ensure_status(client: &dyn JiraClient, key: &str, desired: &str, simulate: bool) -> Result<TransitionOutcome, TransitionError> {
	let issue = client.fetch_issue(key, &["status"])?;
	apply(client, key, issue.status(), desired, simulate)
}
