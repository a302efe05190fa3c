//! Route matching over a segment trie.
//!
//! Patterns decompose into path segments of three kinds: literals,
//! `:name` parameters (capture one segment) and `*name` wildcards
//! (capture everything that remains; the name defaults to `wildcard`).
//! Each trie level keys its children by the literal text, `":"` or `"*"`,
//! so the three kinds can never collide and matching is unambiguous by
//! construction.
//!
//! Lookup walks one node per path segment (O(segment count), independent
//! of how many routes are registered), preferring an exact literal child,
//! then the parameter child, then the wildcard child (which consumes the
//! rest of the path and ends the walk).
//!
//! The trie is built once at router construction and read-only afterwards.

use std::collections::HashMap;
use std::rc::Rc;

use percent_encoding::percent_decode_str;

use crate::route::RouteRecord;

/// Capture name used for anonymous `*` wildcards.
pub const WILDCARD_PARAM: &str = "wildcard";

/// One segment of a compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
	/// Matches its literal text exactly.
	Static(String),
	/// Matches any single segment, capturing it under the given name.
	Param(String),
	/// Matches all remaining segments, captured joined under the name.
	Wildcard(String),
}

/// Split a path into segments.
///
/// The root path `/` is a single empty segment; trailing slashes are
/// ignored (`/users/` and `/users` are the same path).
pub(crate) fn split_path(path: &str) -> Vec<&str> {
	let trimmed = path.trim_end_matches('/');
	let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
	if trimmed.is_empty() {
		vec![""]
	} else {
		trimmed.split('/').collect()
	}
}

/// Decompose a pattern string into segment descriptors.
pub(crate) fn parse_segments(pattern: &str) -> Vec<SegmentKind> {
	split_path(pattern)
		.into_iter()
		.map(|segment| {
			if let Some(name) = segment.strip_prefix(':') {
				SegmentKind::Param(if name.is_empty() {
					"param".to_string()
				} else {
					name.to_string()
				})
			} else if let Some(name) = segment.strip_prefix('*') {
				SegmentKind::Wildcard(if name.is_empty() {
					WILDCARD_PARAM.to_string()
				} else {
					name.to_string()
				})
			} else {
				SegmentKind::Static(segment.to_string())
			}
		})
		.collect()
}

fn decode_segment(raw: &str) -> String {
	percent_decode_str(raw)
		.decode_utf8()
		.map(|decoded| decoded.into_owned())
		.unwrap_or_else(|_| raw.to_string())
}

/// A successful match: the route record plus captured parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	/// The matched record.
	pub record: Rc<RouteRecord>,
	/// Captured path parameters, percent-decoded.
	pub params: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct TrieNode {
	/// Children keyed by literal text, `":"` or `"*"`.
	children: HashMap<String, TrieNode>,
	/// Capture name, set on `":"` and `"*"` nodes.
	param_name: Option<String>,
	/// Terminal record, if a pattern ends at this node.
	record: Option<Rc<RouteRecord>>,
}

/// The route trie.
#[derive(Debug, Default)]
pub struct RouteTrie {
	root: TrieNode,
}

impl RouteTrie {
	/// An empty trie.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `record` under `pattern`.
	///
	/// A wildcard segment ends the pattern; anything after it is ignored.
	pub fn insert(&mut self, pattern: &str, record: Rc<RouteRecord>) {
		let mut node = &mut self.root;
		for kind in parse_segments(pattern) {
			match kind {
				SegmentKind::Static(literal) => {
					node = node.children.entry(literal).or_default();
				}
				SegmentKind::Param(name) => {
					node = node.children.entry(":".to_string()).or_default();
					node.param_name.get_or_insert(name);
				}
				SegmentKind::Wildcard(name) => {
					node = node.children.entry("*".to_string()).or_default();
					node.param_name.get_or_insert(name);
					break;
				}
			}
		}
		node.record = Some(record);
	}

	/// Match a concrete path, returning the record and captured params.
	///
	/// At each level an exact literal child wins over the parameter child,
	/// which wins over the wildcard child.
	pub fn find(&self, path: &str) -> Option<RouteMatch> {
		let segments = split_path(path);
		let mut params = HashMap::new();
		let mut node = &self.root;

		let mut index = 0;
		while index < segments.len() {
			let segment = segments[index];
			if let Some(child) = node.children.get(segment) {
				node = child;
			} else if let Some(child) = node.children.get(":") {
				let name = child
					.param_name
					.clone()
					.unwrap_or_else(|| "param".to_string());
				params.insert(name, decode_segment(segment));
				node = child;
			} else if let Some(child) = node.children.get("*") {
				let name = child
					.param_name
					.clone()
					.unwrap_or_else(|| WILDCARD_PARAM.to_string());
				params.insert(name, decode_segment(&segments[index..].join("/")));
				node = child;
				break;
			} else {
				return None;
			}
			index += 1;
		}

		node.record
			.clone()
			.map(|record| RouteMatch { record, params })
	}
}
