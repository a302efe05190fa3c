//! Error types for the navigation engine.
//!
//! The variants mirror the failure domains of the pipeline: navigation
//! itself, deferred component loading, server component payload fetching,
//! and the session-scoped persistence store. All types are `Clone` because
//! errors flow through shared futures and the router's reactive error
//! signal.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the navigation pipeline.
///
/// A *blocked* navigation (a guard returning false, a middleware calling
/// `abort()`) is not an error: `navigate()` resolves `Ok(false)` instead.
#[derive(Debug, Clone, Error)]
pub enum NavigationError {
	/// No registered route (and no catch-all) matches the requested path.
	#[error("no route matches path: {0}")]
	NoMatch(String),

	/// A redirect chain revisited a route it already passed through.
	#[error("redirect loop detected at route '{0}'")]
	RedirectLoop(String),

	/// A navigation hook or middleware failed.
	#[error("navigation hook failed: {0}")]
	Hook(String),

	/// A route handler failed while producing its view.
	#[error("route handler failed: {0}")]
	Handler(String),

	/// A deferred component load failed or timed out.
	#[error(transparent)]
	Lazy(#[from] LazyLoadError),
}

impl NavigationError {
	/// Shorthand for a hook failure with a formatted message.
	pub fn hook(message: impl Into<String>) -> Self {
		Self::Hook(message.into())
	}

	/// Shorthand for a handler failure with a formatted message.
	pub fn handler(message: impl Into<String>) -> Self {
		Self::Handler(message.into())
	}
}

/// Errors from the lazy load controller.
///
/// `Timeout` is deliberately distinct from `Failed`: a timed-out load is
/// still in flight and may yet populate the component cache, while a
/// failed load has settled and may be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LazyLoadError {
	/// The load did not settle within the configured ceiling.
	#[error("component load timed out after {limit:?}")]
	Timeout {
		/// The configured timeout.
		limit: Duration,
	},

	/// The loader itself failed.
	#[error("component load failed: {0}")]
	Failed(String),
}

/// Errors from fetching server component payloads.
#[derive(Debug, Clone, Error)]
pub enum PscError {
	/// The server answered with a non-success status.
	#[error("payload request for '{url}' failed: {status} {status_text}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// HTTP status text.
		status_text: String,
		/// The requested URL.
		url: String,
	},

	/// The transport failed before a response arrived.
	#[error("payload transport error: {0}")]
	Transport(String),
}

/// Error from a session-scoped persistent store.
///
/// Persistence is best-effort everywhere it is used; callers log and
/// swallow this.
#[derive(Debug, Clone, Error)]
#[error("session store error: {0}")]
pub struct StoreError(pub String);
