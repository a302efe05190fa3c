//! The navigation pipeline.
//!
//! [`Router`] owns the reactive router state, the compiled route table,
//! the hook registries and the scroll manager, and drives every
//! navigation through the same sequence: resolve (following aliases),
//! apply redirects, run leave callbacks, the middleware chain, global
//! before hooks, the route guard and before-resolve hooks, then commit
//! (history entry first, then all state signals inside a single reactive
//! batch), apply the scroll policy and fire enter callbacks.
//!
//! Concurrent `navigate()` calls are not serialized: a second call simply
//! interleaves at await points and the last commit wins. Staleness of
//! asynchronous work is handled downstream with generation counters (see
//! the outlet and the lazy load controller), not by cancellation.
//!
//! Redirects and aliases are followed with explicit bounded loops and
//! visited sets rather than recursion, so pathological configurations
//! fail fast instead of growing the stack.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use pulse_reactive::{Signal, batch};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{RouteLocation, split_target};
use crate::error::NavigationError;
use crate::history::{HistoryBackend, HistoryState, HistorySubscription, MemoryHistory};
use crate::matcher::{RouteMatch, RouteTrie, WILDCARD_PARAM};
use crate::middleware::{MiddlewareContext, NavigationMiddleware, run_chain};
use crate::query::Query;
use crate::route::{Guard, HookResult, RouteConfig, RouteHandler, RouteRecord, compile};
use crate::scroll::{
	DEFAULT_SCROLL_CAPACITY, NoopViewport, ScrollBehavior, ScrollManager, ScrollPosition,
	ScrollTarget, SessionStore, Viewport,
};

/// Per-path callback that can veto leaving; returning `false` aborts.
pub type LeaveHook = Rc<dyn Fn(&RouteLocation, &RouteLocation) -> LocalBoxFuture<'static, bool>>;

/// Per-path callback fired after a committed navigation.
pub type EnterCallback = Rc<dyn Fn(&RouteLocation, &RouteLocation)>;

/// The reactive router state. Every field is independently observable;
/// all of them change together, atomically, on a committed navigation.
#[derive(Clone)]
pub struct RouterState {
	/// Current path (without query string).
	pub path: Signal<String>,
	/// Currently matched route record.
	pub route: Signal<Option<Rc<RouteRecord>>>,
	/// Current path parameters.
	pub params: Signal<HashMap<String, String>>,
	/// Current query parameters.
	pub query: Signal<Query>,
	/// Current merged metadata.
	pub meta: Signal<HashMap<String, Value>>,
	/// Whether a navigation with interceptors is in flight.
	pub loading: Signal<bool>,
	/// The last navigation error, cleared on a successful commit.
	pub error: Signal<Option<NavigationError>>,
}

impl RouterState {
	fn new(initial_path: String) -> Self {
		Self {
			path: Signal::new(initial_path),
			route: Signal::new(None),
			params: Signal::new(HashMap::new()),
			query: Signal::new(Query::new()),
			meta: Signal::new(HashMap::new()),
			loading: Signal::new(false),
			error: Signal::new(None),
		}
	}
}

/// Options for one `navigate()` call.
#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
	/// Replace the current history entry instead of pushing a new one.
	pub replace: bool,
	/// State payload attached to the history entry.
	pub state: Value,
	/// Query parameters merged over any inline `?query` in the path
	/// (explicit entries win per key).
	pub query: HashMap<String, String>,
}

struct RouterInner {
	state: RouterState,
	trie: RouteTrie,
	by_pattern: HashMap<String, Rc<RouteRecord>>,
	catch_all: Option<Rc<RouteRecord>>,
	history: Rc<dyn HistoryBackend>,
	scroll: ScrollManager,
	scroll_behavior: Option<ScrollBehavior>,
	typed_query: bool,
	middlewares: RefCell<Vec<Rc<dyn NavigationMiddleware>>>,
	before_hooks: RefCell<Vec<Guard>>,
	resolve_hooks: RefCell<Vec<Guard>>,
	leave_hooks: RefCell<HashMap<String, Vec<LeaveHook>>>,
	enter_hooks: RefCell<HashMap<String, Vec<EnterCallback>>>,
	history_subscription: RefCell<Option<HistorySubscription>>,
}

/// The router instance. Cloning yields another handle to the same
/// instance.
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

/// Construction-time wiring for a [`Router`].
pub struct RouterBuilder {
	routes: Vec<RouteConfig>,
	middlewares: Vec<Rc<dyn NavigationMiddleware>>,
	history: Option<Rc<dyn HistoryBackend>>,
	viewport: Option<Rc<dyn Viewport>>,
	session_store: Option<Rc<dyn SessionStore>>,
	scroll_capacity: usize,
	typed_query: bool,
	scroll_behavior: Option<ScrollBehavior>,
}

impl RouterBuilder {
	fn new() -> Self {
		Self {
			routes: Vec::new(),
			middlewares: Vec::new(),
			history: None,
			viewport: None,
			session_store: None,
			scroll_capacity: DEFAULT_SCROLL_CAPACITY,
			typed_query: false,
			scroll_behavior: None,
		}
	}

	/// Register a route (tree).
	pub fn route(mut self, config: RouteConfig) -> Self {
		self.routes.push(config);
		self
	}

	/// Register several routes.
	pub fn routes(mut self, configs: impl IntoIterator<Item = RouteConfig>) -> Self {
		self.routes.extend(configs);
		self
	}

	/// Append a middleware to the chain.
	pub fn middleware<M>(mut self, middleware: M) -> Self
	where
		M: NavigationMiddleware + 'static,
	{
		self.middlewares.push(Rc::new(middleware));
		self
	}

	/// Use a custom history backend. Defaults to [`MemoryHistory`].
	pub fn history(mut self, history: Rc<dyn HistoryBackend>) -> Self {
		self.history = Some(history);
		self
	}

	/// Use a custom viewport. Defaults to a no-op viewport.
	pub fn viewport(mut self, viewport: Rc<dyn Viewport>) -> Self {
		self.viewport = Some(viewport);
		self
	}

	/// Persist scroll positions into the given session store.
	pub fn session_store(mut self, store: Rc<dyn SessionStore>) -> Self {
		self.session_store = Some(store);
		self
	}

	/// Bound of the scroll position store.
	pub fn scroll_capacity(mut self, capacity: usize) -> Self {
		self.scroll_capacity = capacity;
		self
	}

	/// Infer numeric/boolean query values instead of keeping raw text.
	pub fn typed_query(mut self, typed: bool) -> Self {
		self.typed_query = typed;
		self
	}

	/// Custom scroll restoration policy.
	pub fn scroll_behavior<F>(mut self, behavior: F) -> Self
	where
		F: Fn(
				&RouteLocation,
				&RouteLocation,
				Option<ScrollPosition>,
			) -> Result<Option<ScrollTarget>, NavigationError>
			+ 'static,
	{
		self.scroll_behavior = Some(Rc::new(behavior));
		self
	}

	/// Compile the route table and build the router.
	pub fn build(self) -> Router {
		let compiled = compile(self.routes);
		let mut trie = RouteTrie::new();
		for record in &compiled.records {
			trie.insert(record.pattern(), Rc::clone(record));
		}

		let history: Rc<dyn HistoryBackend> = self
			.history
			.unwrap_or_else(|| Rc::new(MemoryHistory::new()));
		let viewport: Rc<dyn Viewport> = self.viewport.unwrap_or_else(|| Rc::new(NoopViewport));
		let scroll = ScrollManager::new(
			Rc::clone(&history),
			viewport,
			self.session_store,
			self.scroll_capacity,
		);
		let initial_path = history
			.current()
			.map(|entry| split_target(&entry.path).0.to_string())
			.unwrap_or_else(|| "/".to_string());

		let router = Router {
			inner: Rc::new(RouterInner {
				state: RouterState::new(initial_path),
				trie,
				by_pattern: compiled.by_pattern,
				catch_all: compiled.catch_all,
				history,
				scroll,
				scroll_behavior: self.scroll_behavior,
				typed_query: self.typed_query,
				middlewares: RefCell::new(self.middlewares),
				before_hooks: RefCell::new(Vec::new()),
				resolve_hooks: RefCell::new(Vec::new()),
				leave_hooks: RefCell::new(HashMap::new()),
				enter_hooks: RefCell::new(HashMap::new()),
				history_subscription: RefCell::new(None),
			}),
		};
		router.subscribe_history();
		router
	}
}

impl Router {
	/// Start building a router.
	pub fn builder() -> RouterBuilder {
		RouterBuilder::new()
	}

	/// The reactive router state.
	pub fn state(&self) -> &RouterState {
		&self.inner.state
	}

	/// The scroll manager.
	pub fn scroll(&self) -> &ScrollManager {
		&self.inner.scroll
	}

	/// The history backend.
	pub fn history(&self) -> Rc<dyn HistoryBackend> {
		Rc::clone(&self.inner.history)
	}

	/// Snapshot of the current location, read without dependency
	/// tracking.
	pub fn current_location(&self) -> RouteLocation {
		let state = &self.inner.state;
		RouteLocation {
			path: state.path.peek(),
			params: state.params.peek(),
			query: state.query.peek(),
			meta: state.meta.peek(),
			route: state.route.peek(),
		}
	}

	/// Register a global before hook, run for every navigation in
	/// registration order. `Block` aborts, `Redirect` re-enters the
	/// pipeline.
	pub fn before_each<F, Fut>(&self, hook: F)
	where
		F: Fn(RouteLocation, RouteLocation) -> Fut + 'static,
		Fut: Future<Output = Result<HookResult, NavigationError>> + 'static,
	{
		self.inner.before_hooks.borrow_mut().push(Rc::new(
			move |to: &RouteLocation, from: &RouteLocation| hook(to.clone(), from.clone()).boxed_local(),
		));
	}

	/// Register a before-resolve hook. Same contract as [`before_each`],
	/// but guaranteed to run only after the matched route's own guard has
	/// succeeded.
	///
	/// [`before_each`]: Self::before_each
	pub fn before_resolve<F, Fut>(&self, hook: F)
	where
		F: Fn(RouteLocation, RouteLocation) -> Fut + 'static,
		Fut: Future<Output = Result<HookResult, NavigationError>> + 'static,
	{
		self.inner.resolve_hooks.borrow_mut().push(Rc::new(
			move |to: &RouteLocation, from: &RouteLocation| hook(to.clone(), from.clone()).boxed_local(),
		));
	}

	/// Register a middleware after construction.
	pub fn add_middleware<M>(&self, middleware: M)
	where
		M: NavigationMiddleware + 'static,
	{
		self.inner.middlewares.borrow_mut().push(Rc::new(middleware));
	}

	/// Register a leave callback against `path`: run when navigating away
	/// from it; returning `false` aborts the navigation.
	pub fn on_before_leave<F, Fut>(&self, path: impl Into<String>, hook: F)
	where
		F: Fn(RouteLocation, RouteLocation) -> Fut + 'static,
		Fut: Future<Output = bool> + 'static,
	{
		self.inner
			.leave_hooks
			.borrow_mut()
			.entry(path.into())
			.or_default()
			.push(Rc::new(move |to: &RouteLocation, from: &RouteLocation| {
				hook(to.clone(), from.clone()).boxed_local()
			}));
	}

	/// Register an enter callback against `path`: fired after a committed
	/// navigation onto it.
	pub fn on_after_enter<F>(&self, path: impl Into<String>, callback: F)
	where
		F: Fn(&RouteLocation, &RouteLocation) + 'static,
	{
		self.inner
			.enter_hooks
			.borrow_mut()
			.entry(path.into())
			.or_default()
			.push(Rc::new(callback));
	}

	/// Navigate to `path`.
	///
	/// Resolves `Ok(true)` on commit, `Ok(false)` when a guard or
	/// middleware blocked the navigation (state is untouched), and `Err`
	/// when resolution or a hook failed. Redirects are followed
	/// transparently; the caller only observes the final location.
	pub async fn navigate(
		&self,
		path: &str,
		options: NavigateOptions,
	) -> Result<bool, NavigationError> {
		let loading = self.inner.state.loading.clone();
		let _loading_reset = scopeguard::guard((), move |_| loading.set(false));

		let result = self.run_pipeline(path, &options).await;
		if let Err(error) = &result {
			self.inner.state.error.set(Some(error.clone()));
		}
		result
	}

	/// Navigate with default options.
	pub async fn push(&self, path: &str) -> Result<bool, NavigationError> {
		self.navigate(path, NavigateOptions::default()).await
	}

	/// Navigate, replacing the current history entry.
	pub async fn replace(&self, path: &str) -> Result<bool, NavigationError> {
		self.navigate(
			path,
			NavigateOptions {
				replace: true,
				..Default::default()
			},
		)
		.await
	}

	/// Move back one history entry; reactive state follows via the
	/// history change notification.
	pub async fn back(&self) {
		self.inner.scroll.back().await;
	}

	/// Move forward one history entry.
	pub async fn forward(&self) {
		self.inner.scroll.forward().await;
	}

	/// Move `delta` history entries.
	pub async fn go(&self, delta: i32) {
		self.inner.scroll.go(delta).await;
	}

	/// Warm the code cache for `path` without navigating (hover
	/// prefetch). A no-op for routes without a lazy handler.
	pub async fn preload(&self, path: &str) {
		let (path_only, _) = split_target(path);
		match self.resolve(path_only) {
			Ok(matched) => {
				if let Some(RouteHandler::Lazy(handler)) = matched.record.handler() {
					handler.preload().await;
				}
			}
			Err(error) => debug!(%error, "preload target does not resolve"),
		}
	}

	/// Resolve `path` to a route record and parameters, following alias
	/// chains and falling back to the catch-all route.
	pub fn resolve(&self, path: &str) -> Result<RouteMatch, NavigationError> {
		if let Some(matched) = self.inner.trie.find(path) {
			let record = self.follow_aliases(matched.record);
			return Ok(RouteMatch {
				record,
				params: matched.params,
			});
		}
		if let Some(catch_all) = &self.inner.catch_all {
			let mut params = HashMap::new();
			params.insert(
				WILDCARD_PARAM.to_string(),
				path.trim_start_matches('/').to_string(),
			);
			return Ok(RouteMatch {
				record: Rc::clone(catch_all),
				params,
			});
		}
		Err(NavigationError::NoMatch(path.to_string()))
	}

	/// Follow alias links pattern-to-pattern. A visited set stops the
	/// chain on repetition; resolution keeps the last record reached.
	fn follow_aliases(&self, record: Rc<RouteRecord>) -> Rc<RouteRecord> {
		let mut seen: HashSet<String> = HashSet::new();
		seen.insert(record.pattern().to_string());
		let mut current = record;
		while let Some(alias_target) = current.alias().map(str::to_string) {
			let Some(next) = self.inner.by_pattern.get(&alias_target) else {
				warn!(
					alias_target,
					from = current.pattern(),
					"alias target is not a registered pattern"
				);
				break;
			};
			if !seen.insert(next.pattern().to_string()) {
				break;
			}
			current = Rc::clone(next);
		}
		current
	}

	async fn run_pipeline(
		&self,
		path: &str,
		options: &NavigateOptions,
	) -> Result<bool, NavigationError> {
		let mut target = path.to_string();
		let mut replace = options.replace;
		let mut redirected: HashSet<String> = HashSet::new();
		let from = self.current_location();

		loop {
			let (path_only, raw_query) = split_target(&target);
			let path_only = path_only.to_string();
			let raw_query = raw_query.to_string();

			let matched = self.resolve(&path_only)?;
			let record = matched.record;

			// A redirecting record re-enters resolution with replace
			// semantics. The visited set bounds pathological chains.
			if let Some(redirect) = record.redirect() {
				if !redirected.insert(record.pattern().to_string()) {
					return Err(NavigationError::RedirectLoop(record.pattern().to_string()));
				}
				let location = RouteLocation {
					path: path_only,
					params: matched.params,
					query: Query::parse(&raw_query, self.inner.typed_query),
					meta: record.meta().clone(),
					route: Some(Rc::clone(&record)),
				};
				target = redirect.resolve(&location);
				replace = true;
				continue;
			}

			let mut query = Query::parse(&raw_query, self.inner.typed_query);
			for (key, value) in &options.query {
				query.insert(key.clone(), value.clone());
			}

			let mut to = RouteLocation {
				path: path_only,
				params: matched.params,
				query,
				meta: record.meta().clone(),
				route: Some(Rc::clone(&record)),
			};

			let leave_hooks: Vec<LeaveHook> = self
				.inner
				.leave_hooks
				.borrow()
				.get(&from.path)
				.cloned()
				.unwrap_or_default();
			let middlewares: Vec<Rc<dyn NavigationMiddleware>> =
				self.inner.middlewares.borrow().clone();
			let before_hooks: Vec<Guard> = self.inner.before_hooks.borrow().clone();
			let resolve_hooks: Vec<Guard> = self.inner.resolve_hooks.borrow().clone();

			let has_interceptors = !leave_hooks.is_empty()
				|| !middlewares.is_empty()
				|| !before_hooks.is_empty()
				|| !resolve_hooks.is_empty()
				|| record.before_enter().is_some();
			if has_interceptors {
				self.inner.state.loading.set(true);
			}

			// Leave callbacks of the path being left.
			for hook in &leave_hooks {
				if !hook(&to, &from).await {
					return Ok(false);
				}
			}

			// Middleware chain.
			if !middlewares.is_empty() {
				let mut ctx = MiddlewareContext::new(to.clone(), from.clone());
				run_chain(&middlewares, &mut ctx).await?;
				if ctx.is_aborted() {
					return Ok(false);
				}
				if let Some(redirect) = ctx.redirect_target() {
					target = redirect.to_string();
					replace = true;
					continue;
				}
				to.meta = ctx.meta;
			}

			// Global before hooks.
			match run_guards(&before_hooks, &to, &from).await? {
				HookResult::Continue => {}
				HookResult::Block => return Ok(false),
				HookResult::Redirect(next) => {
					target = next;
					continue;
				}
			}

			// The matched route's own guard.
			if let Some(guard) = record.before_enter() {
				match guard(&to, &from).await? {
					HookResult::Continue => {}
					HookResult::Block => return Ok(false),
					HookResult::Redirect(next) => {
						target = next;
						continue;
					}
				}
			}

			// Before-resolve hooks: only after per-route authorization.
			match run_guards(&resolve_hooks, &to, &from).await? {
				HookResult::Continue => {}
				HookResult::Block => return Ok(false),
				HookResult::Redirect(next) => {
					target = next;
					continue;
				}
			}

			// Persist the scroll offset of the path being left.
			self.inner.scroll.save_position(&from.path);

			// Commit: history first, then all signals in one batch.
			let entry = HistoryState::new(target.clone()).with_state(options.state.clone());
			if replace {
				self.inner.history.replace(entry);
			} else {
				self.inner.history.push(entry);
			}
			self.commit_state(&to);

			// Scroll policy.
			let saved = self.inner.scroll.position(&to.path);
			self.inner
				.scroll
				.handle_scroll(&to, &from, saved, self.inner.scroll_behavior.as_ref());

			// Enter callbacks of the new path.
			let enter_hooks: Vec<EnterCallback> = self
				.inner
				.enter_hooks
				.borrow()
				.get(&to.path)
				.cloned()
				.unwrap_or_default();
			for callback in &enter_hooks {
				callback(&to, &from);
			}

			return Ok(true);
		}
	}

	fn commit_state(&self, to: &RouteLocation) {
		let state = &self.inner.state;
		batch(|| {
			state.path.set(to.path.clone());
			state.route.set(to.route.clone());
			state.params.set(to.params.clone());
			state.query.set(to.query.clone());
			state.meta.set(to.meta.clone());
			state.error.set(None);
		});
	}

	fn subscribe_history(&self) {
		let weak = Rc::downgrade(&self.inner);
		let subscription = self
			.inner
			.history
			.subscribe(Rc::new(move |entry: &HistoryState| {
				if let Some(inner) = weak.upgrade() {
					Router { inner }.sync_from_history(entry);
				}
			}));
		*self.inner.history_subscription.borrow_mut() = Some(subscription);
	}

	/// Bring reactive state in line with an externally changed history
	/// position (back/forward). No new history entry is committed; the
	/// saved scroll position of the target is restored.
	fn sync_from_history(&self, entry: &HistoryState) {
		let (path, raw_query) = split_target(&entry.path);
		let from = self.current_location();
		match self.resolve(path) {
			Ok(matched) => {
				let to = RouteLocation {
					path: path.to_string(),
					params: matched.params,
					query: Query::parse(raw_query, self.inner.typed_query),
					meta: matched.record.meta().clone(),
					route: Some(Rc::clone(&matched.record)),
				};
				self.inner.scroll.save_position(&from.path);
				self.commit_state(&to);
				let saved = self.inner.scroll.position(&to.path);
				self.inner
					.scroll
					.handle_scroll(&to, &from, saved, self.inner.scroll_behavior.as_ref());
			}
			Err(error) => debug!(%error, path, "history entry no longer resolves"),
		}
	}
}

async fn run_guards(
	guards: &[Guard],
	to: &RouteLocation,
	from: &RouteLocation,
) -> Result<HookResult, NavigationError> {
	for guard in guards {
		match guard(to, from).await? {
			HookResult::Continue => {}
			outcome => return Ok(outcome),
		}
	}
	Ok(HookResult::Continue)
}
