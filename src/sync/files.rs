//! File arguments: glob expansion and draft naming.

use std::{
	path::{Path, PathBuf},
	sync::LazyLock,
};

use color_eyre::eyre::{Result, WrapErr, bail};
use regex::Regex;
use walkdir::WalkDir;

static DRAFT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^DRAFT\s*-\s*").expect("static regex"));
static DRAFT_KIND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^DRAFT\s*-\s*(?:(?:Epic|Feature|Story|Subtask)\s*-\s*)?").expect("static regex"));
static KIND_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:Epic|Feature|Story|Subtask)\s*-\s*").expect("static regex"));
static KEY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]*-\d+\s*-\s*").expect("static regex"));

fn has_wildcard(s: &str) -> bool {
	s.contains(['*', '?', '['])
}

/// Expand `*`, `?` and `[...]` in each path component. Arguments without wildcards pass through
/// untouched, even if they do not exist. Order is kept; duplicates are dropped.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
	let mut out: Vec<PathBuf> = Vec::new();
	for pattern in patterns {
		let matches = if has_wildcard(pattern) { expand_glob(pattern)? } else { vec![PathBuf::from(pattern)] };
		tracing::debug!(pattern, matched = matches.len(), "expanded");
		for path in matches {
			if !out.contains(&path) {
				out.push(path);
			}
		}
	}
	Ok(out)
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
	let components: Vec<&str> = pattern.split('/').collect();
	let literal = components.iter().take_while(|c| !has_wildcard(c)).count();
	let (base, implicit_base) = match &components[..literal] {
		[] => (PathBuf::from("."), true),
		[""] => (PathBuf::from("/"), false),
		prefix => (PathBuf::from(prefix.join("/")), false),
	};
	let rest = components[literal..].iter().filter(|c| !c.is_empty()).map(|c| ComponentMatcher::new(c)).collect::<Result<Vec<_>>>()?;
	if rest.is_empty() {
		return Ok(Vec::new());
	}

	let mut out = Vec::new();
	let walker = WalkDir::new(&base)
		.max_depth(rest.len())
		.sort_by_file_name()
		.into_iter()
		.filter_entry(|e| e.depth() == 0 || rest[e.depth() - 1].matches(&e.file_name().to_string_lossy()));
	for entry in walker {
		// Unreadable directories just don't match.
		let Ok(entry) = entry else { continue };
		if entry.depth() != rest.len() {
			continue;
		}
		let path = entry.path();
		let path = if implicit_base { path.strip_prefix(".").unwrap_or(path) } else { path };
		out.push(path.to_path_buf());
	}
	Ok(out)
}

/// One pattern component, compiled.
struct ComponentMatcher {
	re: Regex,
	dot: bool,
}

impl ComponentMatcher {
	fn new(component: &str) -> Result<Self> {
		let re = Regex::new(&component_regex(component)).wrap_err_with(|| format!("Invalid pattern component: {component}"))?;
		Ok(Self { re, dot: component.starts_with('.') })
	}

	/// Hidden entries only match patterns that start with a dot.
	fn matches(&self, name: &str) -> bool {
		(self.dot || !name.starts_with('.')) && self.re.is_match(name)
	}
}

fn component_regex(component: &str) -> String {
	let chars: Vec<char> = component.chars().collect();
	let mut re = String::from("^");
	let mut i = 0;
	while i < chars.len() {
		match chars[i] {
			'*' => re.push_str(".*"),
			'?' => re.push('.'),
			'[' => match chars[i + 1..].iter().skip(1).position(|c| *c == ']') {
				Some(len) => {
					let class = &chars[i + 1..i + 2 + len];
					re.push('[');
					let class = match class.first() {
						Some('!' | '^') => {
							re.push('^');
							&class[1..]
						}
						_ => class,
					};
					for c in class {
						if matches!(c, '\\' | '[' | '&' | '~') {
							re.push('\\');
						}
						re.push(*c);
					}
					re.push(']');
					i += len + 2;
				}
				None => re.push_str(r"\["),
			},
			c => re.push_str(&regex::escape(&c.to_string())),
		}
		i += 1;
	}
	re.push('$');
	re
}

/// A title from a file name: extension, `DRAFT -`, kind and `<KEY> -` prefixes removed.
pub fn title_from_filename(path: &Path) -> String {
	let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
	let name = name.strip_suffix(".md").unwrap_or(&name);
	let name = DRAFT_RE.replace(name, "");
	let name = KIND_PREFIX_RE.replace(&name, "");
	let name = KEY_PREFIX_RE.replace(&name, "");
	name.trim().to_string()
}

/// `DRAFT - [Kind - ]Title.md` → `<KEY> - Title.md` in the same directory. `None` for non-drafts.
pub fn draft_rename_target(path: &Path, key: &str) -> Option<PathBuf> {
	let name = path.file_name()?.to_string_lossy().into_owned();
	if !DRAFT_KIND_RE.is_match(&name) {
		return None;
	}
	let title = DRAFT_KIND_RE.replace(&name, "");
	let title = title.strip_suffix(".md").unwrap_or(&title);
	Some(path.with_file_name(format!("{key} - {title}.md")))
}

/// Rename a draft after creation. Returns the new path if it was renamed.
/// An existing file at the new name is never replaced.
pub fn rename_draft(path: &Path, key: &str) -> Result<Option<PathBuf>> {
	let Some(target) = draft_rename_target(path, key) else { return Ok(None) };
	if target.exists() {
		bail!("Not renaming {}: {} already exists", path.display(), target.display());
	}
	std::fs::rename(path, &target).wrap_err_with(|| format!("Failed to rename {} to {}", path.display(), target.display()))?;
	tracing::info!(from = %path.display(), to = %target.display(), "renamed draft");
	Ok(Some(target))
}
