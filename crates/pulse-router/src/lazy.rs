//! Lazy load controller for code-split routes.
//!
//! [`lazy`] wraps a deferred component load into a route handler. The
//! first resolution starts the loader exactly once; concurrent and later
//! resolutions share the same in-flight operation. A successful load is
//! cached for the lifetime of the process (future navigations never
//! re-fetch), while a failed load clears the slot so the next navigation
//! retries.
//!
//! Staleness is tracked with a generation counter rather than
//! cancellation: every navigation into the route (and every supersede
//! signal from the outlet) advances the generation, and anything that
//! would touch the container first checks that its generation is still
//! current. Superseded loads run to completion and still populate the
//! cache; they just never mutate a container that has moved on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use pulse_pages::View;
use tracing::debug;

use crate::error::LazyLoadError;

/// The deferred load operation.
pub type LazyLoader = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<View, LazyLoadError>>>;

type SharedLoad = Shared<LocalBoxFuture<'static, Result<View, LazyLoadError>>>;

/// Presentation options for a lazy route.
#[derive(Clone, Default)]
pub struct LazyOptions {
	/// Show the loading view only after this much time has passed with
	/// the load still pending. Avoids a loading flash on fast loads.
	pub delay: Option<Duration>,
	/// Hard ceiling on the load; elapsing yields
	/// [`LazyLoadError::Timeout`].
	pub timeout: Option<Duration>,
	/// View shown while the load is pending (subject to `delay`).
	pub loading: Option<Rc<dyn Fn() -> View>>,
	/// View shown when the load fails.
	pub error: Option<Rc<dyn Fn(&LazyLoadError) -> View>>,
}

impl fmt::Debug for LazyOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LazyOptions")
			.field("delay", &self.delay)
			.field("timeout", &self.timeout)
			.field("has_loading", &self.loading.is_some())
			.field("has_error", &self.error.is_some())
			.finish()
	}
}

struct LazyState {
	/// Permanent once a load succeeds.
	cached: Option<View>,
	/// The shared in-flight load, if one is running.
	inflight: Option<SharedLoad>,
	/// Advances on every navigation into the route and on supersede.
	generation: u64,
}

/// Per-route state for a code-split component.
///
/// Clones share state: the component cache, the in-flight load and the
/// generation counter are one per registration.
#[derive(Clone)]
pub struct LazyHandler {
	loader: LazyLoader,
	state: Rc<RefCell<LazyState>>,
	options: LazyOptions,
}

/// Wrap a deferred load into a handler for [`RouteConfig::lazy`].
///
/// [`RouteConfig::lazy`]: crate::route::RouteConfig::lazy
///
/// # Example
///
/// ```ignore
/// let settings = lazy(|| async {
/// 	Ok(View::text("settings panel"))
/// })
/// .with_delay(Duration::from_millis(200))
/// .with_timeout(Duration::from_secs(10));
/// ```
pub fn lazy<F, Fut>(loader: F) -> LazyHandler
where
	F: Fn() -> Fut + 'static,
	Fut: Future<Output = Result<View, LazyLoadError>> + 'static,
{
	LazyHandler::new(Rc::new(move || loader().boxed_local()))
}

impl LazyHandler {
	/// Build a handler from a boxed loader.
	pub fn new(loader: LazyLoader) -> Self {
		Self {
			loader,
			state: Rc::new(RefCell::new(LazyState {
				cached: None,
				inflight: None,
				generation: 0,
			})),
			options: LazyOptions::default(),
		}
	}

	/// Delay before the loading view appears.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.options.delay = Some(delay);
		self
	}

	/// Hard ceiling on the load.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.options.timeout = Some(timeout);
		self
	}

	/// View shown while the load is pending.
	pub fn with_loading_view<F>(mut self, loading: F) -> Self
	where
		F: Fn() -> View + 'static,
	{
		self.options.loading = Some(Rc::new(loading));
		self
	}

	/// View shown when the load fails.
	pub fn with_error_view<F>(mut self, error: F) -> Self
	where
		F: Fn(&LazyLoadError) -> View + 'static,
	{
		self.options.error = Some(Rc::new(error));
		self
	}

	/// Presentation options.
	pub fn options(&self) -> &LazyOptions {
		&self.options
	}

	/// The cached component, once a load has succeeded.
	pub fn cached(&self) -> Option<View> {
		self.state.borrow().cached.clone()
	}

	/// The current load generation.
	pub fn generation(&self) -> u64 {
		self.state.borrow().generation
	}

	/// Advance the generation, invalidating callbacks of earlier
	/// generations. Returns the new generation.
	///
	/// Called on every navigation into the route, and by the outlet to
	/// tell an in-flight load it has been superseded.
	pub fn advance_generation(&self) -> u64 {
		let mut state = self.state.borrow_mut();
		state.generation += 1;
		state.generation
	}

	/// Whether `generation` is still the current one.
	pub fn is_current(&self, generation: u64) -> bool {
		self.state.borrow().generation == generation
	}

	fn inflight(&self) -> SharedLoad {
		let mut state = self.state.borrow_mut();
		if let Some(load) = &state.inflight {
			return load.clone();
		}
		let load = (self.loader)().shared();
		state.inflight = Some(load.clone());
		load
	}

	/// Resolve the component: cached fast path, otherwise join the
	/// (single) in-flight load.
	///
	/// On success the component is cached permanently and the slot
	/// cleared. On failure the slot is cleared so a later navigation
	/// retries. On timeout the slot is kept: the underlying operation is
	/// not aborted, and a retry keeps polling the same load so a late
	/// completion still lands in the cache.
	pub async fn load(&self) -> Result<View, LazyLoadError> {
		if let Some(view) = self.cached() {
			return Ok(view);
		}
		let load = self.inflight();

		let result = match self.options.timeout {
			Some(limit) => match tokio::time::timeout(limit, load).await {
				Ok(result) => result,
				Err(_) => return Err(LazyLoadError::Timeout { limit }),
			},
			None => load.await,
		};

		let mut state = self.state.borrow_mut();
		match &result {
			Ok(view) => {
				state.cached = Some(view.clone());
				state.inflight = None;
			}
			Err(_) => {
				state.inflight = None;
			}
		}
		result
	}

	/// Drive the load without mounting anything (hover prefetch).
	/// Failures are logged and swallowed.
	pub async fn preload(&self) {
		if self.cached().is_some() {
			return;
		}
		if let Err(error) = self.load().await {
			debug!(%error, "component preload failed");
		}
	}
}

impl fmt::Debug for LazyHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("LazyHandler")
			.field("cached", &state.cached.is_some())
			.field("inflight", &state.inflight.is_some())
			.field("generation", &state.generation)
			.finish()
	}
}
