//! Navigation middleware: onion-model interceptors around the pipeline.
//!
//! Middleware compose like layers of an onion: code before the
//! `next.run()` call executes in registration order, code after it in
//! reverse order. The context carries the navigation endpoints, a shared
//! metadata map, and the two control actions [`abort`] and [`redirect`].
//!
//! Control semantics:
//!
//! - After [`abort`], subsequent `next.run()` calls are no-ops, so later
//!   middleware's pre-`next` code is skipped. Earlier middleware's
//!   post-`next` code still runs as the chain unwinds normally.
//! - [`redirect`] only records the target; the chain keeps running and the
//!   pipeline acts on the recorded path once the chain settles.
//!
//! This is deliberately distinct from the simpler per-hook
//! [`HookResult`](crate::route::HookResult) contract used by global and
//! per-route guards, which the pipeline wraps directly.
//!
//! [`abort`]: MiddlewareContext::abort
//! [`redirect`]: MiddlewareContext::redirect

use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RouteLocation;
use crate::error::NavigationError;

/// Mutable state threaded through the middleware chain.
pub struct MiddlewareContext {
	/// The navigation target.
	pub to: RouteLocation,
	/// The location being left.
	pub from: RouteLocation,
	/// Shared metadata; merged into `to.meta` after the chain settles.
	pub meta: HashMap<String, Value>,
	aborted: bool,
	redirect: Option<String>,
}

impl MiddlewareContext {
	/// Build a context for one chain run. The metadata map starts from
	/// the target route's own metadata.
	pub fn new(to: RouteLocation, from: RouteLocation) -> Self {
		let meta = to.meta.clone();
		Self {
			to,
			from,
			meta,
			aborted: false,
			redirect: None,
		}
	}

	/// Abort the navigation. Later middleware will not run.
	pub fn abort(&mut self) {
		self.aborted = true;
	}

	/// Whether the navigation has been aborted.
	pub fn is_aborted(&self) -> bool {
		self.aborted
	}

	/// Record a redirect target for the pipeline to act on after the
	/// chain settles.
	pub fn redirect(&mut self, path: impl Into<String>) {
		self.redirect = Some(path.into());
	}

	/// The recorded redirect target, if any.
	pub fn redirect_target(&self) -> Option<&str> {
		self.redirect.as_deref()
	}

	/// Set a shared metadata entry.
	pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.meta.insert(key.into(), value.into());
	}
}

/// An interceptor in the navigation pipeline.
#[async_trait(?Send)]
pub trait NavigationMiddleware {
	/// Process the navigation, calling `next.run(ctx)` to hand control to
	/// the rest of the chain. Not calling it short-circuits the chain
	/// (the pipeline treats this like any other settled run).
	async fn handle(
		&self,
		ctx: &mut MiddlewareContext,
		next: Next<'_>,
	) -> Result<(), NavigationError>;
}

/// Handle to the remainder of the middleware chain.
pub struct Next<'a> {
	remaining: &'a [Rc<dyn NavigationMiddleware>],
}

impl Next<'_> {
	/// Run the rest of the chain. A no-op once the context is aborted or
	/// the chain is exhausted.
	pub async fn run(self, ctx: &mut MiddlewareContext) -> Result<(), NavigationError> {
		let Some((head, rest)) = self.remaining.split_first() else {
			return Ok(());
		};
		if ctx.aborted {
			return Ok(());
		}
		head.handle(ctx, Next { remaining: rest }).await
	}
}

/// Run `middlewares` over `ctx` in registration order.
pub async fn run_chain(
	middlewares: &[Rc<dyn NavigationMiddleware>],
	ctx: &mut MiddlewareContext,
) -> Result<(), NavigationError> {
	Next {
		remaining: middlewares,
	}
	.run(ctx)
	.await
}
