//! The outlet: mounts the matched route's view into a container.
//!
//! An outlet owns a reactive effect over the router's `{route, params,
//! query}` signals. When any of them change it starts a new render
//! generation, tells the previously mounted route's lazy handler it has
//! been superseded, removes the old view (optionally deferred by a
//! transition duration) and resolves the new handler:
//!
//! - synchronous handlers mount directly, wrapped in the route's layout
//!   chain;
//! - asynchronous and lazy handlers resolve on a spawned local task and
//!   mount only if their generation is still current; superseded work
//!   completes (populating caches) but never touches the container;
//! - handler errors are logged and rendered through the configurable
//!   error view, never propagated to the navigation caller.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use pulse_pages::{Container, View};
use pulse_reactive::Effect;
use tracing::warn;

use crate::context::RouteLocation;
use crate::error::NavigationError;
use crate::lazy::LazyHandler;
use crate::query::Query;
use crate::route::{RouteHandler, RouteRecord};
use crate::router::Router;

/// Schedules a local (non-`Send`) future for execution.
pub type Spawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

/// The default spawner: `tokio::task::spawn_local`. Requires a
/// `LocalSet` context.
pub fn local_spawner() -> Spawner {
	Rc::new(|future| {
		tokio::task::spawn_local(future);
	})
}

/// Presentation options for an outlet.
#[derive(Clone, Default)]
pub struct OutletOptions {
	/// View shown while an async handler resolves. Without one the
	/// container is simply emptied for the wait.
	pub placeholder: Option<Rc<dyn Fn() -> View>>,
	/// View shown when a handler fails. Without one the container is
	/// emptied (the failure is still logged).
	pub error_view: Option<Rc<dyn Fn(&NavigationError) -> View>>,
	/// Defer removal of the old view by this long (CSS transition
	/// window).
	pub transition: Option<Duration>,
	/// Task spawner; defaults to [`local_spawner`].
	pub spawner: Option<Spawner>,
}

impl fmt::Debug for OutletOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OutletOptions")
			.field("has_placeholder", &self.placeholder.is_some())
			.field("has_error_view", &self.error_view.is_some())
			.field("transition", &self.transition)
			.finish()
	}
}

struct OutletShared {
	router: Router,
	container: Container,
	options: OutletOptions,
	spawner: Spawner,
	/// Render generation; mutations check it before touching the
	/// container.
	generation: Cell<u64>,
	/// The route whose view currently occupies the container.
	mounted: RefCell<Option<Rc<RouteRecord>>>,
}

/// A mounted outlet. Dropping it disposes the driving effect; the
/// container keeps its last content.
pub struct Outlet {
	shared: Rc<OutletShared>,
	_effect: Effect,
}

impl Outlet {
	/// Attach an outlet to `router`, rendering into `container`.
	pub fn attach(router: &Router, container: Container, options: OutletOptions) -> Self {
		let spawner = options.spawner.clone().unwrap_or_else(local_spawner);
		let shared = Rc::new(OutletShared {
			router: router.clone(),
			container,
			options,
			spawner,
			generation: Cell::new(0),
			mounted: RefCell::new(None),
		});

		let state = router.state().clone();
		let effect_shared = Rc::clone(&shared);
		let effect = Effect::new(move || {
			let route = state.route.get();
			let params = state.params.get();
			let query = state.query.get();
			let path = state.path.peek();
			effect_shared.render(route, path, params, query);
		});

		Self {
			shared,
			_effect: effect,
		}
	}

	/// The container this outlet renders into.
	pub fn container(&self) -> &Container {
		&self.shared.container
	}

	/// The router driving this outlet.
	pub fn router(&self) -> &Router {
		&self.shared.router
	}
}

impl fmt::Debug for Outlet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Outlet")
			.field("generation", &self.shared.generation.get())
			.finish()
	}
}

impl OutletShared {
	fn is_current(&self, generation: u64) -> bool {
		self.generation.get() == generation
	}

	fn render(
		self: &Rc<Self>,
		route: Option<Rc<RouteRecord>>,
		path: String,
		params: HashMap<String, String>,
		query: Query,
	) {
		let generation = self.generation.get() + 1;
		self.generation.set(generation);

		// The previously mounted route's in-flight load is now stale.
		if let Some(previous) = self.mounted.borrow_mut().take() {
			if let Some(RouteHandler::Lazy(handler)) = previous.handler() {
				handler.advance_generation();
			}
		}

		let Some(record) = route else {
			self.remove_old_view(generation);
			return;
		};

		let location = RouteLocation {
			path,
			params,
			query,
			meta: record.meta().clone(),
			route: Some(Rc::clone(&record)),
		};

		match record.handler().cloned() {
			None => self.remove_old_view(generation),
			Some(RouteHandler::View(factory)) => {
				if let Some(delay) = self.options.transition {
					let shared = Rc::clone(self);
					(self.spawner)(Box::pin(async move {
						tokio::time::sleep(delay).await;
						if shared.is_current(generation) {
							shared.mount(&record, factory(&location), generation);
						}
					}));
				} else {
					self.mount(&record, factory(&location), generation);
				}
			}
			Some(RouteHandler::Async(factory)) => {
				self.await_placeholder(generation);
				let future = factory(&location);
				let shared = Rc::clone(self);
				(self.spawner)(Box::pin(async move {
					match future.await {
						Ok(view) => {
							if shared.is_current(generation) {
								shared.mount(&record, view, generation);
							}
						}
						Err(error) => shared.show_error(&record, &error, generation),
					}
				}));
			}
			Some(RouteHandler::Lazy(handler)) => {
				self.await_placeholder(generation);
				let load_generation = handler.advance_generation();
				let shared = Rc::clone(self);
				(self.spawner)(Box::pin(async move {
					shared
						.resolve_lazy(record, handler, generation, load_generation)
						.await;
				}));
			}
		}
	}

	/// Drive a lazy handler: shared load, loading view after the
	/// configured delay, mount/error only while both the outlet and the
	/// load generation are current.
	async fn resolve_lazy(
		self: &Rc<Self>,
		record: Rc<RouteRecord>,
		handler: LazyHandler,
		generation: u64,
		load_generation: u64,
	) {
		let options = handler.options().clone();
		let load = handler.load();
		futures::pin_mut!(load);

		let result = if let Some(loading) = options.loading.clone() {
			let delay = options.delay.unwrap_or_default();
			tokio::select! {
				result = &mut load => result,
				_ = tokio::time::sleep(delay) => {
					// A fast load never shows the flash; a stale timer
					// never touches a container that moved on.
					if handler.is_current(load_generation) && self.is_current(generation) {
						self.container.replace(loading());
					}
					load.await
				}
			}
		} else {
			load.await
		};

		match result {
			Ok(view) => {
				// The cache was populated regardless; only the mount is
				// gated on staleness.
				if self.is_current(generation) && handler.is_current(load_generation) {
					self.mount(&record, view, generation);
				}
			}
			Err(error) => {
				if !self.is_current(generation) || !handler.is_current(load_generation) {
					return;
				}
				warn!(%error, route = record.pattern(), "lazy component failed to load");
				if let Some(error_view) = &options.error {
					self.container.replace(error_view(&error));
				} else {
					self.show_error(&record, &NavigationError::from(error), generation);
				}
			}
		}
	}

	/// Show the placeholder, or remove the old view, while an async
	/// resolution is pending.
	fn await_placeholder(self: &Rc<Self>, generation: u64) {
		match &self.options.placeholder {
			Some(placeholder) => self.container.replace(placeholder()),
			None => self.remove_old_view(generation),
		}
	}

	/// Remove the currently mounted view, deferred by the configured
	/// transition duration.
	fn remove_old_view(self: &Rc<Self>, generation: u64) {
		match self.options.transition {
			Some(delay) => {
				let shared = Rc::clone(self);
				(self.spawner)(Box::pin(async move {
					tokio::time::sleep(delay).await;
					if shared.is_current(generation) {
						shared.container.clear();
					}
				}));
			}
			None => self.container.clear(),
		}
	}

	fn mount(&self, record: &Rc<RouteRecord>, view: View, generation: u64) {
		if !self.is_current(generation) {
			return;
		}
		self.container.replace(record.apply_layouts(view));
		*self.mounted.borrow_mut() = Some(Rc::clone(record));
	}

	fn show_error(&self, record: &Rc<RouteRecord>, error: &NavigationError, generation: u64) {
		if !self.is_current(generation) {
			return;
		}
		warn!(%error, route = record.pattern(), "route handler failed");
		match &self.options.error_view {
			Some(error_view) => self.container.replace(error_view(error)),
			None => self.container.clear(),
		}
	}
}
