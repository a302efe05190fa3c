//! Navigation contexts.
//!
//! A [`RouteLocation`] describes one endpoint of a navigation: the `to`
//! side (where the pipeline is heading) or the `from` side (where it
//! left). Locations are built fresh for every navigation attempt and
//! discarded after commit or abort; hooks, guards, middleware, handlers
//! and the scroll behavior all receive them.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::query::Query;
use crate::route::RouteRecord;

/// One endpoint of a navigation.
#[derive(Clone, Default)]
pub struct RouteLocation {
	/// The path, without query string.
	pub path: String,
	/// Path parameters captured by the matcher, percent-decoded.
	pub params: HashMap<String, String>,
	/// Parsed query parameters.
	pub query: Query,
	/// Route metadata merged with middleware-contributed metadata.
	pub meta: HashMap<String, Value>,
	/// The matched route record, if any.
	pub route: Option<Rc<RouteRecord>>,
}

impl RouteLocation {
	/// The location a freshly constructed router reports before any
	/// navigation: the given path with nothing resolved.
	pub(crate) fn unresolved(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	/// Look up a path parameter.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Look up a metadata value.
	pub fn meta_value(&self, key: &str) -> Option<&Value> {
		self.meta.get(key)
	}
}

impl fmt::Debug for RouteLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteLocation")
			.field("path", &self.path)
			.field("params", &self.params)
			.field("query", &self.query)
			.field("route", &self.route.as_ref().map(|r| r.pattern()))
			.finish()
	}
}

/// Split a navigation target into path and raw query string.
pub(crate) fn split_target(target: &str) -> (&str, &str) {
	match target.split_once('?') {
		Some((path, query)) => (path, query),
		None => (target, ""),
	}
}
