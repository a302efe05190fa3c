//! Scroll position store and restoration policy.
//!
//! Saved offsets live in a bounded LRU keyed by path. When persistence is
//! enabled, every save also serializes the store snapshot into a
//! session-scoped store, best-effort: failures are logged and swallowed,
//! never surfaced to the navigation.
//!
//! [`ScrollManager::handle_scroll`] applies the restoration policy in
//! order: a caller-supplied behavior function (guarded: an error falls
//! back to the origin, an invalid selector is ignored, a `None` return is
//! an explicit no-scroll), then a previously saved position, then the
//! origin.
//!
//! [`back`]/[`forward`]/[`go`] save the current offset, invoke the
//! platform history, and wait for the next change notification, bounded
//! by a fixed fallback timeout for moves the platform never reports
//! (e.g. out-of-range).
//!
//! [`back`]: ScrollManager::back
//! [`forward`]: ScrollManager::forward
//! [`go`]: ScrollManager::go

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::RouteLocation;
use crate::error::{NavigationError, StoreError};
use crate::history::HistoryBackend;
use crate::lru::Lru;

/// Default bound of the scroll position store.
pub const DEFAULT_SCROLL_CAPACITY: usize = 100;

/// How long to wait for a history change notification before giving up.
const HISTORY_SETTLE_FALLBACK: Duration = Duration::from_millis(100);

/// Session store key for the persisted snapshot.
const SCROLL_STORE_KEY: &str = "pulse:scroll-positions";

/// A viewport offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
	/// Horizontal offset.
	pub x: f64,
	/// Vertical offset.
	pub y: f64,
}

impl ScrollPosition {
	/// The document origin.
	pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

	/// A position at the given offsets.
	pub fn at(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Where a custom scroll behavior wants the viewport to go.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
	/// Scroll the first element matching the selector into view.
	Element {
		/// A selector understood by the viewport.
		selector: String,
	},
	/// Scroll to a fixed offset.
	Position(ScrollPosition),
}

/// Caller-supplied scroll policy.
///
/// `Ok(None)` is an explicit no-scroll; an `Err` falls back to scrolling
/// to the origin.
pub type ScrollBehavior = Rc<
	dyn Fn(
		&RouteLocation,
		&RouteLocation,
		Option<ScrollPosition>,
	) -> Result<Option<ScrollTarget>, NavigationError>,
>;

/// The platform viewport.
pub trait Viewport {
	/// The current offset.
	fn offset(&self) -> ScrollPosition;

	/// Scroll to an absolute offset.
	fn scroll_to(&self, position: ScrollPosition);

	/// Scroll the first element matching `selector` into view.
	///
	/// Returns `Ok(false)` when no element matches and `Err` for a
	/// selector the platform cannot parse.
	fn scroll_into_view(&self, selector: &str) -> Result<bool, String>;
}

/// A viewport that ignores everything. Used on targets without one.
#[derive(Debug, Default)]
pub struct NoopViewport;

impl Viewport for NoopViewport {
	fn offset(&self) -> ScrollPosition {
		ScrollPosition::ORIGIN
	}

	fn scroll_to(&self, _position: ScrollPosition) {}

	fn scroll_into_view(&self, _selector: &str) -> Result<bool, String> {
		Ok(false)
	}
}

/// A session-scoped key/value store (sessionStorage equivalent).
pub trait SessionStore {
	/// Read a value.
	fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Write a value.
	fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
	items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemorySessionStore {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}
}

impl SessionStore for MemorySessionStore {
	fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.items.borrow().get(key).cloned())
	}

	fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.items
			.borrow_mut()
			.insert(key.to_string(), value.to_string());
		Ok(())
	}
}

/// Bounded scroll position store plus restoration policy.
pub struct ScrollManager {
	positions: RefCell<Lru<String, ScrollPosition>>,
	viewport: Rc<dyn Viewport>,
	history: Rc<dyn HistoryBackend>,
	store: Option<Rc<dyn SessionStore>>,
}

impl ScrollManager {
	/// Build a manager. Passing a session store enables cross-reload
	/// persistence; a previously persisted snapshot is restored
	/// immediately (best-effort).
	pub fn new(
		history: Rc<dyn HistoryBackend>,
		viewport: Rc<dyn Viewport>,
		store: Option<Rc<dyn SessionStore>>,
		capacity: usize,
	) -> Self {
		let mut positions = Lru::new(capacity);
		if let Some(store) = &store {
			match store.get_item(SCROLL_STORE_KEY) {
				Ok(Some(snapshot)) => {
					match serde_json::from_str::<Vec<(String, ScrollPosition)>>(&snapshot) {
						Ok(entries) => {
							for (path, position) in entries {
								positions.insert(path, position);
							}
						}
						Err(error) => {
							debug!(%error, "discarding unreadable scroll snapshot");
						}
					}
				}
				Ok(None) => {}
				Err(error) => debug!(%error, "scroll snapshot unavailable"),
			}
		}
		Self {
			positions: RefCell::new(positions),
			viewport,
			history,
			store,
		}
	}

	/// Record the current viewport offset for `path`.
	pub fn save_position(&self, path: &str) {
		let offset = self.viewport.offset();
		self.positions.borrow_mut().insert(path.to_string(), offset);
		self.persist();
	}

	/// The last saved offset for `path`, refreshing its recency.
	pub fn position(&self, path: &str) -> Option<ScrollPosition> {
		self.positions.borrow_mut().get(&path.to_string()).copied()
	}

	/// Number of tracked paths.
	pub fn len(&self) -> usize {
		self.positions.borrow().len()
	}

	/// Whether no positions are tracked.
	pub fn is_empty(&self) -> bool {
		self.positions.borrow().is_empty()
	}

	fn persist(&self) {
		let Some(store) = &self.store else {
			return;
		};
		let snapshot: Vec<(String, ScrollPosition)> = self
			.positions
			.borrow()
			.iter()
			.map(|(path, position)| (path.clone(), *position))
			.collect();
		match serde_json::to_string(&snapshot) {
			Ok(json) => {
				if let Err(error) = store.set_item(SCROLL_STORE_KEY, &json) {
					warn!(%error, "failed to persist scroll positions");
				}
			}
			Err(error) => warn!(%error, "failed to serialize scroll positions"),
		}
	}

	/// Apply the restoration policy after a committed navigation.
	pub fn handle_scroll(
		&self,
		to: &RouteLocation,
		from: &RouteLocation,
		saved: Option<ScrollPosition>,
		behavior: Option<&ScrollBehavior>,
	) {
		if let Some(behavior) = behavior {
			match behavior(to, from, saved) {
				Err(error) => {
					warn!(%error, "scroll behavior failed, scrolling to origin");
					self.viewport.scroll_to(ScrollPosition::ORIGIN);
				}
				Ok(None) => {}
				Ok(Some(ScrollTarget::Element { selector })) => {
					if let Err(error) = self.viewport.scroll_into_view(&selector) {
						debug!(%error, selector, "invalid scroll selector ignored");
					}
				}
				Ok(Some(ScrollTarget::Position(position))) => {
					self.viewport.scroll_to(position);
				}
			}
			return;
		}
		match saved {
			Some(position) => self.viewport.scroll_to(position),
			None => self.viewport.scroll_to(ScrollPosition::ORIGIN),
		}
	}

	/// Move one entry back, saving scroll first. Resolves once the
	/// history notifies, or after the fallback timeout.
	pub async fn back(&self) {
		self.travel(-1).await;
	}

	/// Move one entry forward, saving scroll first.
	pub async fn forward(&self) {
		self.travel(1).await;
	}

	/// Move `delta` entries, saving scroll first.
	pub async fn go(&self, delta: i32) {
		self.travel(delta).await;
	}

	async fn travel(&self, delta: i32) {
		if let Some(current) = self.history.current() {
			self.save_position(&current.path);
		}

		let (sender, receiver) = futures::channel::oneshot::channel::<()>();
		let sender = Rc::new(RefCell::new(Some(sender)));
		let subscription = self.history.subscribe(Rc::new(move |_| {
			if let Some(sender) = sender.borrow_mut().take() {
				let _ = sender.send(());
			}
		}));

		self.history.go(delta);

		// The platform may never notify (no-op movement); the fallback
		// bounds the wait.
		tokio::select! {
			_ = receiver => {}
			_ = tokio::time::sleep(HISTORY_SETTLE_FALLBACK) => {}
		}
		drop(subscription);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::history::{HistoryState, MemoryHistory};
	use std::cell::Cell;

	/// Viewport that records every scroll call.
	#[derive(Default)]
	pub(crate) struct RecordingViewport {
		pub(crate) offset: Cell<ScrollPosition>,
		pub(crate) scrolls: RefCell<Vec<ScrollPosition>>,
		pub(crate) selectors: RefCell<Vec<String>>,
	}

	impl Viewport for RecordingViewport {
		fn offset(&self) -> ScrollPosition {
			self.offset.get()
		}

		fn scroll_to(&self, position: ScrollPosition) {
			self.scrolls.borrow_mut().push(position);
		}

		fn scroll_into_view(&self, selector: &str) -> Result<bool, String> {
			if selector.starts_with("!!") {
				return Err(format!("unparsable selector: {selector}"));
			}
			self.selectors.borrow_mut().push(selector.to_string());
			Ok(true)
		}
	}

	/// Store whose writes always fail.
	struct BrokenStore;

	impl SessionStore for BrokenStore {
		fn get_item(&self, _key: &str) -> Result<Option<String>, StoreError> {
			Err(StoreError("quota exceeded".into()))
		}

		fn set_item(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
			Err(StoreError("quota exceeded".into()))
		}
	}

	fn manager_with(
		viewport: Rc<RecordingViewport>,
		store: Option<Rc<dyn SessionStore>>,
	) -> ScrollManager {
		ScrollManager::new(
			Rc::new(MemoryHistory::new()),
			viewport,
			store,
			DEFAULT_SCROLL_CAPACITY,
		)
	}

	#[test]
	fn test_save_and_restore_position() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), None);

		viewport.offset.set(ScrollPosition::at(0.0, 250.0));
		manager.save_position("/articles");
		assert_eq!(
			manager.position("/articles"),
			Some(ScrollPosition::at(0.0, 250.0))
		);
		assert_eq!(manager.position("/missing"), None);
	}

	#[test]
	fn test_store_is_capacity_bounded() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = ScrollManager::new(
			Rc::new(MemoryHistory::new()),
			viewport.clone(),
			None,
			3,
		);

		for path in ["/a", "/b", "/c"] {
			manager.save_position(path);
		}
		// Touch "/a" so "/b" is the least recently used.
		let _ = manager.position("/a");
		manager.save_position("/d");

		assert_eq!(manager.len(), 3);
		assert!(manager.position("/b").is_none());
		assert!(manager.position("/a").is_some());
	}

	#[test]
	fn test_persistence_roundtrip() {
		let viewport = Rc::new(RecordingViewport::default());
		let store = Rc::new(MemorySessionStore::new());

		{
			let manager = manager_with(viewport.clone(), Some(store.clone()));
			viewport.offset.set(ScrollPosition::at(0.0, 99.0));
			manager.save_position("/kept");
		}

		// A fresh manager sharing the store sees the snapshot.
		let manager = manager_with(viewport.clone(), Some(store));
		assert_eq!(manager.position("/kept"), Some(ScrollPosition::at(0.0, 99.0)));
	}

	#[test]
	fn test_persistence_failure_is_swallowed() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), Some(Rc::new(BrokenStore)));

		// Must not panic or error; the in-memory store still works.
		manager.save_position("/a");
		assert!(manager.position("/a").is_some());
	}

	#[test]
	fn test_handle_scroll_restores_saved_position() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), None);

		let to = RouteLocation::unresolved("/to");
		let from = RouteLocation::unresolved("/from");
		manager.handle_scroll(&to, &from, Some(ScrollPosition::at(0.0, 42.0)), None);
		assert_eq!(*viewport.scrolls.borrow(), vec![ScrollPosition::at(0.0, 42.0)]);
	}

	#[test]
	fn test_handle_scroll_defaults_to_origin() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), None);

		let to = RouteLocation::unresolved("/to");
		let from = RouteLocation::unresolved("/from");
		manager.handle_scroll(&to, &from, None, None);
		assert_eq!(*viewport.scrolls.borrow(), vec![ScrollPosition::ORIGIN]);
	}

	#[test]
	fn test_behavior_selector_and_noop() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), None);
		let to = RouteLocation::unresolved("/to");
		let from = RouteLocation::unresolved("/from");

		let behavior: ScrollBehavior = Rc::new(|_, _, _| {
			Ok(Some(ScrollTarget::Element {
				selector: "#section".into(),
			}))
		});
		manager.handle_scroll(&to, &from, None, Some(&behavior));
		assert_eq!(*viewport.selectors.borrow(), vec!["#section"]);

		// Explicit no-scroll.
		let noop: ScrollBehavior = Rc::new(|_, _, _| Ok(None));
		manager.handle_scroll(&to, &from, Some(ScrollPosition::at(0.0, 7.0)), Some(&noop));
		assert!(viewport.scrolls.borrow().is_empty());
	}

	#[test]
	fn test_behavior_error_falls_back_to_origin() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), None);
		let to = RouteLocation::unresolved("/to");
		let from = RouteLocation::unresolved("/from");

		let failing: ScrollBehavior =
			Rc::new(|_, _, _| Err(NavigationError::hook("behavior exploded")));
		manager.handle_scroll(&to, &from, None, Some(&failing));
		assert_eq!(*viewport.scrolls.borrow(), vec![ScrollPosition::ORIGIN]);
	}

	#[test]
	fn test_invalid_selector_is_ignored() {
		let viewport = Rc::new(RecordingViewport::default());
		let manager = manager_with(viewport.clone(), None);
		let to = RouteLocation::unresolved("/to");
		let from = RouteLocation::unresolved("/from");

		let behavior: ScrollBehavior = Rc::new(|_, _, _| {
			Ok(Some(ScrollTarget::Element {
				selector: "!!bogus".into(),
			}))
		});
		manager.handle_scroll(&to, &from, None, Some(&behavior));
		assert!(viewport.scrolls.borrow().is_empty());
		assert!(viewport.selectors.borrow().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_back_saves_scroll_and_waits_for_notification() {
		let history = Rc::new(MemoryHistory::new());
		history.push(HistoryState::new("/a"));

		let viewport = Rc::new(RecordingViewport::default());
		viewport.offset.set(ScrollPosition::at(0.0, 10.0));
		let manager = ScrollManager::new(
			history.clone(),
			viewport.clone(),
			None,
			DEFAULT_SCROLL_CAPACITY,
		);

		manager.back().await;
		assert_eq!(history.current().unwrap().path, "/");
		// The offset of the page being left was recorded.
		assert_eq!(manager.position("/a"), Some(ScrollPosition::at(0.0, 10.0)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_noop_movement_resolves_via_fallback_timeout() {
		let history = Rc::new(MemoryHistory::new());
		let viewport = Rc::new(RecordingViewport::default());
		let manager = ScrollManager::new(
			history.clone(),
			viewport.clone(),
			None,
			DEFAULT_SCROLL_CAPACITY,
		);

		// Nothing to go back to: no notification ever fires, the
		// fallback timer resolves the wait.
		manager.back().await;
		assert_eq!(history.current().unwrap().path, "/");
	}
}
