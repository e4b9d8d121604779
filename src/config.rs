//! Runtime settings: defaults, then the first `.env` file found, then the process environment.
//!
//! `.env` values are fed to the config builder directly and never exported into the process environment.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr, bail};
use serde::Deserialize;
use smart_default::SmartDefault;
use url::Url;

use crate::jira::JiraError;

const ENV_PREFIX: &str = "JIRA";

#[derive(Clone, Debug, Deserialize, PartialEq, SmartDefault)]
#[serde(default)]
pub struct Settings {
	pub base_url: Option<String>,
	pub email: Option<String>,
	pub api_token: Option<String>,
	#[default("WOR".to_string())]
	pub project_key: String,
	/// Per-request timeout.
	#[default(30)]
	pub timeout_secs: u64,
}

/// Everything needed to talk to Jira.
#[derive(Clone, Debug)]
pub struct Credentials {
	pub base_url: Url,
	pub email: String,
	pub api_token: String,
}

impl Settings {
	/// Load from `env_file` (or the first `.env` in the usual places) and the process environment.
	pub fn load(env_file: Option<&Path>) -> Result<Self> {
		let dotenv = match env_file {
			Some(path) => {
				if !path.is_file() {
					bail!("env file not found: {}", path.display());
				}
				Some(path.to_path_buf())
			}
			None => find_dotenv(),
		};
		Self::from_sources(dotenv.as_deref(), None)
	}

	/// `environment` replaces the process environment when given.
	pub fn from_sources(dotenv: Option<&Path>, environment: Option<config::Map<String, String>>) -> Result<Self> {
		let mut builder = config::Config::builder().set_default("project_key", "WOR")?.set_default("timeout_secs", 30i64)?;

		if let Some(path) = dotenv {
			tracing::debug!(path = %path.display(), "loading env file");
			for (key, value) in read_dotenv(path)? {
				builder = builder.set_default(key, value)?;
			}
		}

		let mut env_source = config::Environment::with_prefix(ENV_PREFIX).ignore_empty(true);
		if environment.is_some() {
			env_source = env_source.source(environment);
		}

		let settings: Settings = builder
			.add_source(env_source)
			.build()
			.wrap_err("Failed to assemble settings")?
			.try_deserialize()
			.wrap_err("Invalid settings")?;
		Ok(settings)
	}

	/// Fails naming the first missing variable.
	pub fn credentials(&self) -> Result<Credentials, JiraError> {
		let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
		let base_url = present(&self.base_url).ok_or(JiraError::MissingCredentials("JIRA_BASE_URL"))?;
		let email = present(&self.email).ok_or(JiraError::MissingCredentials("JIRA_EMAIL"))?;
		let api_token = present(&self.api_token).ok_or(JiraError::MissingCredentials("JIRA_API_TOKEN"))?;
		let base_url = Url::parse(&base_url).map_err(|source| JiraError::InvalidBaseUrl { url: base_url.clone(), source })?;
		Ok(Credentials { base_url, email, api_token })
	}
}

/// `JIRA_BASE_URL=..` → `("base_url", ..)`. Other keys are kept lowercased.
fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>> {
	let iter = dotenvy::from_path_iter(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
	let mut out = Vec::new();
	for item in iter {
		let (key, value) = item.wrap_err_with(|| format!("Malformed line in {}", path.display()))?;
		if value.trim().is_empty() {
			continue;
		}
		let key = key.strip_prefix(&format!("{ENV_PREFIX}_")).unwrap_or(&key).to_lowercase();
		out.push((key, value));
	}
	Ok(out)
}

/// Executable dir, working dir, then the working dir's parent.
fn find_dotenv() -> Option<PathBuf> {
	let exe_dir = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf));
	let cwd = std::env::current_dir().ok();
	let parent = cwd.as_deref().and_then(Path::parent).map(Path::to_path_buf);
	[exe_dir, cwd, parent].into_iter().flatten().map(|dir| dir.join(".env")).find(|p| p.is_file())
}
