//! Query string parsing and typed value inference.
//!
//! `?tab=posts&page=2&archived=true` parses into a [`Query`] map. By
//! default every value is text; with typed inference enabled (a router
//! construction option), values that look like numbers or booleans are
//! promoted to [`QueryValue::Number`] / [`QueryValue::Bool`].
//!
//! Serialization back to a string is key-sorted and stable, which makes it
//! usable as the payload-cache key component.

use std::collections::BTreeMap;
use std::fmt;

/// A parsed query value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
	/// An uninterpreted string.
	Text(String),
	/// A numeric value (typed inference only).
	Number(f64),
	/// A boolean value (typed inference only).
	Bool(bool),
}

impl QueryValue {
	/// Infer a typed value from its raw text form.
	fn infer(raw: String) -> Self {
		match raw.as_str() {
			"true" => return Self::Bool(true),
			"false" => return Self::Bool(false),
			_ => {}
		}
		// Only promote fully-numeric strings; "1px" and "" stay text.
		if !raw.is_empty() && raw.parse::<f64>().is_ok() {
			return Self::Number(raw.parse::<f64>().unwrap_or_default());
		}
		Self::Text(raw)
	}

	/// The text content, for [`Text`](Self::Text) values.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	/// The numeric value, for [`Number`](Self::Number) values.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Number(n) => Some(*n),
			_ => None,
		}
	}

	/// The boolean value, for [`Bool`](Self::Bool) values.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}
}

impl fmt::Display for QueryValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => write!(f, "{}", text),
			Self::Number(n) => write!(f, "{}", n),
			Self::Bool(b) => write!(f, "{}", b),
		}
	}
}

impl From<&str> for QueryValue {
	fn from(raw: &str) -> Self {
		Self::Text(raw.to_string())
	}
}

impl From<String> for QueryValue {
	fn from(raw: String) -> Self {
		Self::Text(raw)
	}
}

/// An ordered map of query parameters.
///
/// Keys iterate in sorted order so that serialization is deterministic.
/// Repeated keys keep the last occurrence, matching the flat-map model the
/// rest of the pipeline uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
	entries: BTreeMap<String, QueryValue>,
}

impl Query {
	/// An empty query.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse a raw query string (without the leading `?`).
	///
	/// Percent-decoding is handled by the urlencoded parser; a malformed
	/// string yields an empty query rather than an error, since a bad
	/// query must never block navigation.
	pub fn parse(raw: &str, typed: bool) -> Self {
		let mut entries = BTreeMap::new();
		if raw.is_empty() {
			return Self { entries };
		}
		let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();
		for (key, value) in pairs {
			let value = if typed {
				QueryValue::infer(value)
			} else {
				QueryValue::Text(value)
			};
			entries.insert(key, value);
		}
		Self { entries }
	}

	/// Look up a parameter.
	pub fn get(&self, key: &str) -> Option<&QueryValue> {
		self.entries.get(key)
	}

	/// Look up a parameter's text content.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.entries.get(key).and_then(QueryValue::as_str)
	}

	/// Insert or replace a parameter.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
		self.entries.insert(key.into(), value.into());
	}

	/// Number of parameters.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether there are no parameters.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterate parameters in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
		self.entries.iter()
	}

	/// Serialize to a key-sorted, percent-encoded query string.
	pub fn to_query_string(&self) -> String {
		let pairs: Vec<(&str, String)> = self
			.entries
			.iter()
			.map(|(key, value)| (key.as_str(), value.to_string()))
			.collect();
		serde_urlencoded::to_string(pairs).unwrap_or_default()
	}
}
