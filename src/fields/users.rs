//! Resolving people named in records (emails, names) to Jira account ids.

use std::{cell::RefCell, collections::HashMap, sync::LazyLock};

use regex::Regex;

use super::FieldValue;
use crate::jira::{JiraClient, JiraError};

static ACCOUNT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:_-]{10,}$").expect("static regex"));

/// Whether `s` is already an account id and can be sent as-is.
pub fn looks_like_account_id(s: &str) -> bool {
	!s.contains('@') && ACCOUNT_ID_RE.is_match(s)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AccountLookup {
	Found(String),
	/// Non-empty query with no match, or the lookup was not allowed to hit the network.
	Unresolved,
	/// Nothing to resolve.
	Empty,
}

/// Looks people up, at most once per distinct query.
pub struct UserResolver<'a> {
	client: Option<&'a dyn JiraClient>,
	allow_network: bool,
	cache: RefCell<HashMap<String, AccountLookup>>,
}

impl<'a> UserResolver<'a> {
	/// `allow_network` is false for dry runs; unresolved people then show up as `<unresolved:..>` placeholders.
	pub fn new(client: Option<&'a dyn JiraClient>, allow_network: bool) -> Self {
		Self {
			client,
			allow_network: allow_network && client.is_some(),
			cache: RefCell::new(HashMap::new()),
		}
	}

	pub fn offline() -> Self {
		Self::new(None, false)
	}

	pub fn lookup(&self, query: &str) -> Result<AccountLookup, JiraError> {
		let query = query.trim();
		if query.is_empty() {
			return Ok(AccountLookup::Empty);
		}
		if looks_like_account_id(query) {
			return Ok(AccountLookup::Found(query.to_string()));
		}
		let Some(client) = self.client.filter(|_| self.allow_network) else {
			return Ok(AccountLookup::Unresolved);
		};
		if let Some(cached) = self.cache.borrow().get(query) {
			return Ok(cached.clone());
		}

		let users = client.search_users(query)?;
		let exact = users
			.iter()
			.find(|u| u.email_address.as_deref().is_some_and(|email| email.eq_ignore_ascii_case(query)))
			.and_then(|u| u.account_id.clone());
		let result = match exact.or_else(|| users.iter().find_map(|u| u.account_id.clone())) {
			Some(account_id) => AccountLookup::Found(account_id),
			None => AccountLookup::Unresolved,
		};
		tracing::debug!(query, ?result, "user lookup");
		self.cache.borrow_mut().insert(query.to_string(), result.clone());
		Ok(result)
	}

	/// Field value for a person, or `None` when it should be left out.
	pub fn field_value(&self, query: &str) -> Result<Option<FieldValue>, JiraError> {
		Ok(match self.lookup(query)? {
			AccountLookup::Found(account_id) => Some(FieldValue::Account(account_id)),
			AccountLookup::Unresolved if !self.allow_network => Some(FieldValue::Account(format!("<unresolved:{}>", query.trim()))),
			AccountLookup::Unresolved => {
				tracing::warn!("no Jira user matches {query:?}, leaving the field out");
				None
			}
			AccountLookup::Empty => None,
		})
	}
}
