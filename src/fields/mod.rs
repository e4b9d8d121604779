//! Outgoing Jira field sets.
//!
//! Every value sent to Jira is a [`FieldValue`], collected in a [`FieldSet`] and
//! checked against the per-kind [`schema`] before it leaves the process.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

pub mod mapping;
pub mod remote;
pub mod schema;
pub mod users;

pub use mapping::{create_fields, followup_fields, update_fields};
pub use remote::RemoteSnapshot;
pub use schema::Shape;
pub use users::{AccountLookup, UserResolver};

/// One outgoing field value, tagged with its wire shape.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
	Text(String),
	Int(i64),
	Float(f64),
	Labels(Vec<String>),
	/// `{"key": ..}`
	Key(String),
	/// `{"id": ..}`
	Id(String),
	/// `{"name": ..}`
	Name(String),
	/// `{"accountId": ..}`
	Account(String),
	/// ADF document.
	RichText(Value),
}

impl FieldValue {
	pub fn shape(&self) -> Shape {
		match self {
			Self::Text(_) => Shape::Text,
			Self::Int(_) => Shape::Int,
			Self::Float(_) => Shape::Float,
			Self::Labels(_) => Shape::Labels,
			Self::Key(_) => Shape::Key,
			Self::Id(_) => Shape::Id,
			Self::Name(_) => Shape::Name,
			Self::Account(_) => Shape::Account,
			Self::RichText(_) => Shape::RichText,
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			Self::Text(s) => json!(s),
			Self::Int(i) => json!(i),
			Self::Float(f) => json!(f),
			Self::Labels(labels) => json!(labels),
			Self::Key(key) => json!({ "key": key }),
			Self::Id(id) => json!({ "id": id }),
			Self::Name(name) => json!({ "name": name }),
			Self::Account(account) => json!({ "accountId": account }),
			Self::RichText(doc) => doc.clone(),
		}
	}
}

/// Field id → value, ordered by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSet {
	fields: BTreeMap<String, FieldValue>,
}

impl FieldSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, id: impl Into<String>, value: FieldValue) {
		self.fields.insert(id.into(), value);
	}

	pub fn remove(&mut self, id: &str) -> Option<FieldValue> {
		self.fields.remove(id)
	}

	pub fn get(&self, id: &str) -> Option<&FieldValue> {
		self.fields.get(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.fields.contains_key(id)
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Copy without `id`.
	pub fn without(&self, id: &str) -> Self {
		let mut out = self.clone();
		out.remove(id);
		out
	}

	pub fn to_json(&self) -> Value {
		Value::Object(self.fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
	}

	/// Sorted JSON with four-space indentation, as printed in dry runs.
	pub fn to_pretty_string(&self) -> String {
		pretty_json(&self.to_json())
	}
}

impl Serialize for FieldSet {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

/// Four-space indented JSON.
pub fn pretty_json(value: &Value) -> String {
	let mut buf = Vec::new();
	let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
	let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
	match value.serialize(&mut ser) {
		Ok(()) => String::from_utf8(buf).unwrap_or_default(),
		Err(_) => value.to_string(),
	}
}
