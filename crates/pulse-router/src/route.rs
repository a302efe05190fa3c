//! Route records and the route configuration surface.
//!
//! Applications describe their routes as a tree of [`RouteConfig`] nodes:
//! each node carries a path pattern and either a handler (sync view
//! factory, async view factory, or a lazily loaded component), a redirect,
//! or just children. Group nodes contribute no path prefix but propagate a
//! shared layout to their descendants.
//!
//! At router construction the tree is compiled into immutable
//! [`RouteRecord`]s, one per concrete pattern, which are then shared
//! (`Rc`) between the trie, the pipeline and the outlet, and never mutated
//! again.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use pulse_pages::View;
use serde_json::Value;

use crate::context::RouteLocation;
use crate::error::NavigationError;
use crate::lazy::LazyHandler;
use crate::matcher::{SegmentKind, parse_segments};

/// Outcome of a guard or navigation hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult {
	/// Proceed with the navigation.
	Continue,
	/// Abort; `navigate()` resolves `false` and state is untouched.
	Block,
	/// Re-enter the pipeline targeting the given path.
	Redirect(String),
}

/// A guard: may block or redirect a navigation.
pub type Guard =
	Rc<dyn Fn(&RouteLocation, &RouteLocation) -> LocalBoxFuture<'static, Result<HookResult, NavigationError>>>;

/// A layout wrapper applied around a route's view.
pub type Layout = Rc<dyn Fn(View) -> View>;

/// Factory for asynchronously produced views.
pub type AsyncViewFactory =
	Rc<dyn Fn(&RouteLocation) -> LocalBoxFuture<'static, Result<View, NavigationError>>>;

/// How a matched route produces its view.
#[derive(Clone)]
pub enum RouteHandler {
	/// Synchronous view factory; mounted directly.
	View(Rc<dyn Fn(&RouteLocation) -> View>),
	/// Asynchronous view factory; awaited by the outlet.
	Async(AsyncViewFactory),
	/// Code-split component behind the lazy load controller.
	Lazy(LazyHandler),
}

impl fmt::Debug for RouteHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::View(_) => f.write_str("RouteHandler::View"),
			Self::Async(_) => f.write_str("RouteHandler::Async"),
			Self::Lazy(_) => f.write_str("RouteHandler::Lazy"),
		}
	}
}

/// Where a redirecting route sends the navigation.
#[derive(Clone)]
pub enum RedirectTarget {
	/// A literal path.
	Path(String),
	/// Computed from the resolved location (params and query).
	Compute(Rc<dyn Fn(&RouteLocation) -> String>),
}

impl RedirectTarget {
	/// Resolve the target path for `location`.
	pub fn resolve(&self, location: &RouteLocation) -> String {
		match self {
			Self::Path(path) => path.clone(),
			Self::Compute(compute) => compute(location),
		}
	}
}

impl fmt::Debug for RedirectTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path(path) => write!(f, "RedirectTarget::Path({:?})", path),
			Self::Compute(_) => f.write_str("RedirectTarget::Compute"),
		}
	}
}

/// A compiled route. Immutable once built; shared via `Rc`.
pub struct RouteRecord {
	pattern: String,
	segments: Vec<SegmentKind>,
	handler: Option<RouteHandler>,
	redirect: Option<RedirectTarget>,
	before_enter: Option<Guard>,
	/// Layout chain, outermost (closest to the root) first.
	layouts: Vec<Layout>,
	meta: HashMap<String, Value>,
	alias: Option<String>,
}

impl RouteRecord {
	/// The full pattern this record was registered under.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Segment descriptors of the pattern.
	pub fn segments(&self) -> &[SegmentKind] {
		&self.segments
	}

	/// The handler, if this route renders a view.
	pub fn handler(&self) -> Option<&RouteHandler> {
		self.handler.as_ref()
	}

	/// The redirect target, if this route forwards elsewhere.
	pub fn redirect(&self) -> Option<&RedirectTarget> {
		self.redirect.as_ref()
	}

	/// The per-route guard.
	pub fn before_enter(&self) -> Option<&Guard> {
		self.before_enter.as_ref()
	}

	/// Route metadata.
	pub fn meta(&self) -> &HashMap<String, Value> {
		&self.meta
	}

	/// The alias target pattern, if this route is an alias.
	pub fn alias(&self) -> Option<&str> {
		self.alias.as_deref()
	}

	/// Wrap `view` in this route's layout chain, innermost first.
	pub fn apply_layouts(&self, view: View) -> View {
		self.layouts
			.iter()
			.rev()
			.fold(view, |wrapped, layout| layout(wrapped))
	}

	#[cfg(test)]
	pub(crate) fn bare(pattern: &str) -> Rc<Self> {
		Rc::new(Self {
			pattern: pattern.to_string(),
			segments: parse_segments(pattern),
			handler: None,
			redirect: None,
			before_enter: None,
			layouts: Vec::new(),
			meta: HashMap::new(),
			alias: None,
		})
	}
}

impl fmt::Debug for RouteRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRecord")
			.field("pattern", &self.pattern)
			.field("handler", &self.handler)
			.field("redirect", &self.redirect)
			.field("has_guard", &self.before_enter.is_some())
			.field("layouts", &self.layouts.len())
			.field("alias", &self.alias)
			.finish()
	}
}

/// One node of the route configuration tree.
///
/// # Example
///
/// ```ignore
/// let routes = vec![
/// 	RouteConfig::view("/", |_| View::text("home")),
/// 	RouteConfig::nested("/users")
/// 		.child(RouteConfig::view("", |_| View::text("list")))
/// 		.child(RouteConfig::view(":id", |loc| {
/// 			View::text(format!("user {}", loc.param("id").unwrap_or("?")))
/// 		})),
/// 	RouteConfig::redirect("/old", "/"),
/// ];
/// ```
pub struct RouteConfig {
	pattern: String,
	group: bool,
	handler: Option<RouteHandler>,
	redirect: Option<RedirectTarget>,
	before_enter: Option<Guard>,
	layout: Option<Layout>,
	meta: HashMap<String, Value>,
	alias: Option<String>,
	children: Vec<RouteConfig>,
}

impl RouteConfig {
	fn base(pattern: impl Into<String>) -> Self {
		Self {
			pattern: pattern.into(),
			group: false,
			handler: None,
			redirect: None,
			before_enter: None,
			layout: None,
			meta: HashMap::new(),
			alias: None,
			children: Vec::new(),
		}
	}

	/// A route rendering a synchronous view.
	pub fn view<F>(pattern: impl Into<String>, handler: F) -> Self
	where
		F: Fn(&RouteLocation) -> View + 'static,
	{
		let mut config = Self::base(pattern);
		config.handler = Some(RouteHandler::View(Rc::new(handler)));
		config
	}

	/// A route rendering an asynchronously produced view.
	pub fn async_view<F, Fut>(pattern: impl Into<String>, handler: F) -> Self
	where
		F: Fn(&RouteLocation) -> Fut + 'static,
		Fut: Future<Output = Result<View, NavigationError>> + 'static,
	{
		let mut config = Self::base(pattern);
		config.handler = Some(RouteHandler::Async(Rc::new(move |location| {
			handler(location).boxed_local()
		})));
		config
	}

	/// A code-split route behind a [`LazyHandler`].
	pub fn lazy(pattern: impl Into<String>, handler: LazyHandler) -> Self {
		let mut config = Self::base(pattern);
		config.handler = Some(RouteHandler::Lazy(handler));
		config
	}

	/// A route redirecting to a literal path.
	pub fn redirect(pattern: impl Into<String>, target: impl Into<String>) -> Self {
		let mut config = Self::base(pattern);
		config.redirect = Some(RedirectTarget::Path(target.into()));
		config
	}

	/// A route redirecting to a computed path.
	pub fn redirect_to<F>(pattern: impl Into<String>, target: F) -> Self
	where
		F: Fn(&RouteLocation) -> String + 'static,
	{
		let mut config = Self::base(pattern);
		config.redirect = Some(RedirectTarget::Compute(Rc::new(target)));
		config
	}

	/// A container node: contributes its pattern as a prefix but renders
	/// nothing itself.
	pub fn nested(pattern: impl Into<String>) -> Self {
		Self::base(pattern)
	}

	/// A group: contributes no path prefix but propagates its layout to
	/// all descendants.
	pub fn group() -> Self {
		let mut config = Self::base("");
		config.group = true;
		config
	}

	/// Attach a metadata entry.
	pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Attach a per-route guard.
	pub fn before_enter<F, Fut>(mut self, guard: F) -> Self
	where
		F: Fn(RouteLocation, RouteLocation) -> Fut + 'static,
		Fut: Future<Output = Result<HookResult, NavigationError>> + 'static,
	{
		self.before_enter = Some(Rc::new(move |to: &RouteLocation, from: &RouteLocation| {
			guard(to.clone(), from.clone()).boxed_local()
		}));
		self
	}

	/// Register this route as an alias of another pattern: matching it
	/// resolves to the target's record without changing the URL.
	pub fn with_alias(mut self, target: impl Into<String>) -> Self {
		self.alias = Some(target.into());
		self
	}

	/// Attach a layout wrapper, inherited by descendants.
	pub fn with_layout<F>(mut self, layout: F) -> Self
	where
		F: Fn(View) -> View + 'static,
	{
		self.layout = Some(Rc::new(layout));
		self
	}

	/// Append a child route.
	pub fn child(mut self, child: RouteConfig) -> Self {
		self.children.push(child);
		self
	}

	/// Append several child routes.
	pub fn children(mut self, children: impl IntoIterator<Item = RouteConfig>) -> Self {
		self.children.extend(children);
		self
	}
}

/// The compiled route table.
pub(crate) struct CompiledRoutes {
	pub(crate) records: Vec<Rc<RouteRecord>>,
	/// Pattern -> record, used to resolve alias chains.
	pub(crate) by_pattern: HashMap<String, Rc<RouteRecord>>,
	/// The `"*"` fallback, kept out of the trie.
	pub(crate) catch_all: Option<Rc<RouteRecord>>,
}

/// Flatten a configuration tree into records.
pub(crate) fn compile(configs: Vec<RouteConfig>) -> CompiledRoutes {
	let mut compiled = CompiledRoutes {
		records: Vec::new(),
		by_pattern: HashMap::new(),
		catch_all: None,
	};
	for config in configs {
		flatten(config, "", &[], &mut compiled);
	}
	compiled
}

fn flatten(config: RouteConfig, prefix: &str, layouts: &[Layout], out: &mut CompiledRoutes) {
	let RouteConfig {
		pattern,
		group,
		handler,
		redirect,
		before_enter,
		layout,
		meta,
		alias,
		children,
	} = config;

	let mut layouts = layouts.to_vec();
	if let Some(layout) = layout {
		layouts.push(layout);
	}

	let is_catch_all = !group && pattern == "*";
	let full = if group {
		prefix.to_string()
	} else if is_catch_all {
		pattern
	} else {
		join_patterns(prefix, &pattern)
	};

	if !group && (handler.is_some() || redirect.is_some() || alias.is_some()) {
		let record = Rc::new(RouteRecord {
			pattern: full.clone(),
			segments: parse_segments(&full),
			handler,
			redirect,
			before_enter,
			layouts: layouts.clone(),
			meta,
			alias,
		});
		if is_catch_all {
			out.catch_all = Some(record);
		} else {
			out.by_pattern.insert(full.clone(), Rc::clone(&record));
			out.records.push(record);
		}
	}

	for child in children {
		flatten(child, &full, &layouts, out);
	}
}

fn join_patterns(prefix: &str, pattern: &str) -> String {
	let child = pattern.trim_start_matches('/');
	let base = prefix.trim_end_matches('/');
	if child.is_empty() {
		if base.is_empty() {
			"/".to_string()
		} else {
			base.to_string()
		}
	} else if base.is_empty() {
		format!("/{}", child)
	} else {
		format!("{}/{}", base, child)
	}
}
