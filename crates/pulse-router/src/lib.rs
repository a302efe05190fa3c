//! Client-side navigation engine for Pulse.
//!
//! This crate turns a requested path into a committed application view:
//!
//! - [`matcher`]: a segment trie mapping path patterns (static, `:param`,
//!   `*wildcard`) to route records in O(path length);
//! - [`router`]: the navigation pipeline: alias and redirect resolution,
//!   leave callbacks, the middleware chain, guards, the atomic reactive
//!   commit, scroll policy and enter callbacks;
//! - [`middleware`]: onion-model interceptors with abort/redirect and a
//!   shared metadata map;
//! - [`scroll`] and [`history`]: bounded scroll position store with
//!   optional session persistence over a platform history abstraction;
//! - [`lazy`]: race-safe deferred component loading with generations,
//!   loading-view delay and timeout;
//! - [`psc`]: a staleness-aware LRU for server component payloads with
//!   deduplicated prefetching;
//! - [`outlet`]: the reactive effect mounting the matched view into a
//!   container.
//!
//! Everything is single-threaded by design: state lives in `Rc`-shared
//! structures, async work suspends at await points on a cooperative
//! scheduler, and correctness under interleaved navigations comes from
//! generation counters, not cancellation.

pub mod context;
pub mod error;
pub mod history;
pub mod lazy;
pub mod lru;
pub mod matcher;
pub mod middleware;
pub mod outlet;
pub mod psc;
pub mod query;
pub mod route;
pub mod router;
pub mod scroll;

pub use context::RouteLocation;
pub use error::{LazyLoadError, NavigationError, PscError, StoreError};
pub use history::{
	HistoryBackend, HistoryCallback, HistoryState, HistorySubscription, MemoryHistory,
};
pub use lazy::{LazyHandler, LazyLoader, LazyOptions, lazy};
pub use lru::Lru;
pub use matcher::{RouteMatch, RouteTrie, SegmentKind, WILDCARD_PARAM};
pub use middleware::{MiddlewareContext, NavigationMiddleware, Next, run_chain};
pub use outlet::{Outlet, OutletOptions, Spawner, local_spawner};
pub use psc::{
	DEFAULT_PSC_CAPACITY, DEFAULT_STALE_TIME, PSC_ACCEPT, PSC_NAVIGATION, PscClient, PscOptions,
	PscResponse, PscTransport,
};
pub use query::{Query, QueryValue};
pub use route::{
	AsyncViewFactory, Guard, HookResult, Layout, RedirectTarget, RouteConfig, RouteHandler,
	RouteRecord,
};
pub use router::{
	EnterCallback, LeaveHook, NavigateOptions, Router, RouterBuilder, RouterState,
};
pub use scroll::{
	DEFAULT_SCROLL_CAPACITY, MemorySessionStore, NoopViewport, ScrollBehavior, ScrollManager,
	ScrollPosition, ScrollTarget, SessionStore, Viewport,
};
