//! Jira rejects text nodes that are both `code` and `strong`.

use serde_json::Value;

fn mark_type(mark: &Value) -> Option<&str> {
	mark.get("type").and_then(Value::as_str)
}

/// Copy of `doc` where no node carries both `code` and `strong` marks.
///
/// When both are present only the `code` marks survive; every other mark on that node is dropped too.
pub fn normalize_marks(doc: &Value) -> Value {
	let mut out = doc.clone();
	normalize_in_place(&mut out);
	out
}

fn normalize_in_place(node: &mut Value) {
	match node {
		Value::Object(map) => {
			if let Some(Value::Array(marks)) = map.get_mut("marks") {
				let has = |name: &str| marks.iter().any(|m| mark_type(m) == Some(name));
				if has("code") && has("strong") {
					marks.retain(|m| mark_type(m) == Some("code"));
				}
			}
			map.values_mut().for_each(normalize_in_place);
		}
		Value::Array(items) => items.iter_mut().for_each(normalize_in_place),
		_ => {}
	}
}
