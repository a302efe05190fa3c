//! View tree: elements, text, fragments.
//!
//! A [`View`] is the opaque renderable value route handlers return.
//! [`Element`] is a builder for element nodes; text content is escaped
//! when serialized.

use std::fmt;

/// A renderable node.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
	/// An element with a tag, attributes and children.
	Element(Element),
	/// A text node. Escaped on serialization.
	Text(String),
	/// A sequence of sibling nodes without a wrapper element.
	Fragment(Vec<View>),
	/// Nothing.
	Empty,
}

impl View {
	/// A text node.
	pub fn text(content: impl Into<String>) -> Self {
		Self::Text(content.into())
	}

	/// A fragment of sibling nodes.
	pub fn fragment(children: Vec<View>) -> Self {
		Self::Fragment(children)
	}

	/// Whether this view renders to nothing.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Empty => true,
			Self::Text(text) => text.is_empty(),
			Self::Fragment(children) => children.iter().all(View::is_empty),
			Self::Element(_) => false,
		}
	}

	/// Serialize to an HTML string.
	pub fn render_to_string(&self) -> String {
		let mut out = String::new();
		self.render_into(&mut out);
		out
	}

	fn render_into(&self, out: &mut String) {
		match self {
			Self::Element(element) => element.render_into(out),
			Self::Text(text) => out.push_str(&escape_html(text)),
			Self::Fragment(children) => {
				for child in children {
					child.render_into(out);
				}
			}
			Self::Empty => {}
		}
	}
}

impl From<Element> for View {
	fn from(element: Element) -> Self {
		Self::Element(element)
	}
}

impl fmt::Display for View {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.render_to_string())
	}
}

/// An element node, built with a consuming builder.
///
/// # Example
///
/// ```
/// use pulse_pages::{Element, View};
///
/// let view: View = Element::new("div")
/// 	.class("card")
/// 	.child(View::text("hello"))
/// 	.into();
/// assert_eq!(view.render_to_string(), r#"<div class="card">hello</div>"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
	tag: String,
	attributes: Vec<(String, String)>,
	children: Vec<View>,
}

impl Element {
	/// Create an element with the given tag.
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			attributes: Vec::new(),
			children: Vec::new(),
		}
	}

	/// Set an attribute.
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.push((name.into(), value.into()));
		self
	}

	/// Set the `class` attribute.
	pub fn class(self, value: impl Into<String>) -> Self {
		self.attr("class", value)
	}

	/// Append a child node.
	pub fn child(mut self, child: impl Into<View>) -> Self {
		self.children.push(child.into());
		self
	}

	/// Append a text child.
	pub fn text(self, content: impl Into<String>) -> Self {
		self.child(View::text(content))
	}

	/// Tag name.
	pub fn tag(&self) -> &str {
		&self.tag
	}

	fn render_into(&self, out: &mut String) {
		out.push('<');
		out.push_str(&self.tag);
		for (name, value) in &self.attributes {
			out.push(' ');
			out.push_str(name);
			out.push_str("=\"");
			out.push_str(&escape_html(value));
			out.push('"');
		}
		out.push('>');
		for child in &self.children {
			child.render_into(out);
		}
		out.push_str("</");
		out.push_str(&self.tag);
		out.push('>');
	}
}

fn escape_html(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());
	for c in raw.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			other => escaped.push(other),
		}
	}
	escaped
}
