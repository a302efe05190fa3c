//! Platform history abstraction.
//!
//! The router talks to the host environment's navigation stack through
//! [`HistoryBackend`]: push/replace entries, move through the stack, and
//! subscribe to change notifications (the popstate equivalent, fired for
//! stack *movement*, not for push/replace, matching browser semantics).
//!
//! [`MemoryHistory`] is the default backend: an in-process entry stack
//! used on non-browser targets and in tests.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the navigation stack: the full target (path plus query
/// string) and the caller-supplied state payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
	/// The navigated-to target.
	pub path: String,
	/// Arbitrary state attached by the navigation caller.
	#[serde(default)]
	pub state: Value,
}

impl HistoryState {
	/// An entry with no state payload.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			state: Value::Null,
		}
	}

	/// Attach a state payload.
	pub fn with_state(mut self, state: Value) -> Self {
		self.state = state;
		self
	}
}

/// Callback invoked when the history stack position changes.
pub type HistoryCallback = Rc<dyn Fn(&HistoryState)>;

/// The platform navigation stack.
pub trait HistoryBackend {
	/// Append an entry, discarding any forward entries.
	fn push(&self, entry: HistoryState);

	/// Replace the current entry.
	fn replace(&self, entry: HistoryState);

	/// Move `delta` entries through the stack. Out-of-range moves are
	/// silent no-ops and fire no notification.
	fn go(&self, delta: i32);

	/// Move one entry back.
	fn back(&self) {
		self.go(-1);
	}

	/// Move one entry forward.
	fn forward(&self) {
		self.go(1);
	}

	/// The current entry, if the stack is non-empty.
	fn current(&self) -> Option<HistoryState>;

	/// Subscribe to stack-position changes. Dropping the returned guard
	/// unsubscribes.
	fn subscribe(&self, callback: HistoryCallback) -> HistorySubscription;
}

/// RAII guard for a history subscription.
pub struct HistorySubscription {
	cancel: Option<Box<dyn FnOnce()>>,
}

impl HistorySubscription {
	/// Wrap an unsubscribe action.
	pub fn new(cancel: impl FnOnce() + 'static) -> Self {
		Self {
			cancel: Some(Box::new(cancel)),
		}
	}
}

impl Drop for HistorySubscription {
	fn drop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

impl fmt::Debug for HistorySubscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("HistorySubscription")
	}
}

struct MemoryHistoryInner {
	entries: Vec<HistoryState>,
	index: usize,
	subscribers: Vec<(u64, HistoryCallback)>,
	next_subscriber: u64,
}

/// In-process history stack.
///
/// Starts with a single `/` entry, like a freshly opened document.
#[derive(Clone)]
pub struct MemoryHistory {
	inner: Rc<RefCell<MemoryHistoryInner>>,
}

impl MemoryHistory {
	/// A stack containing only the root entry.
	pub fn new() -> Self {
		Self {
			inner: Rc::new(RefCell::new(MemoryHistoryInner {
				entries: vec![HistoryState::new("/")],
				index: 0,
				subscribers: Vec::new(),
				next_subscriber: 0,
			})),
		}
	}

	/// Number of entries in the stack.
	pub fn len(&self) -> usize {
		self.inner.borrow().entries.len()
	}

	/// Whether the stack is empty. Always false in practice; kept for
	/// API symmetry.
	pub fn is_empty(&self) -> bool {
		self.inner.borrow().entries.is_empty()
	}

	fn notify(&self, entry: &HistoryState) {
		// Snapshot subscribers so callbacks may subscribe/unsubscribe.
		let subscribers: Vec<HistoryCallback> = self
			.inner
			.borrow()
			.subscribers
			.iter()
			.map(|(_, callback)| Rc::clone(callback))
			.collect();
		for callback in subscribers {
			callback(entry);
		}
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.borrow();
		f.debug_struct("MemoryHistory")
			.field("entries", &inner.entries.len())
			.field("index", &inner.index)
			.finish()
	}
}

impl HistoryBackend for MemoryHistory {
	fn push(&self, entry: HistoryState) {
		let mut inner = self.inner.borrow_mut();
		let keep = inner.index + 1;
		inner.entries.truncate(keep);
		inner.entries.push(entry);
		inner.index = inner.entries.len() - 1;
	}

	fn replace(&self, entry: HistoryState) {
		let mut inner = self.inner.borrow_mut();
		let index = inner.index;
		inner.entries[index] = entry;
	}

	fn go(&self, delta: i32) {
		let entry = {
			let mut inner = self.inner.borrow_mut();
			let target = inner.index as i64 + i64::from(delta);
			if target < 0 || target >= inner.entries.len() as i64 {
				return;
			}
			inner.index = target as usize;
			inner.entries[inner.index].clone()
		};
		self.notify(&entry);
	}

	fn current(&self) -> Option<HistoryState> {
		let inner = self.inner.borrow();
		inner.entries.get(inner.index).cloned()
	}

	fn subscribe(&self, callback: HistoryCallback) -> HistorySubscription {
		let id = {
			let mut inner = self.inner.borrow_mut();
			let id = inner.next_subscriber;
			inner.next_subscriber += 1;
			inner.subscribers.push((id, callback));
			id
		};
		let weak: Weak<RefCell<MemoryHistoryInner>> = Rc::downgrade(&self.inner);
		HistorySubscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner
					.borrow_mut()
					.subscribers
					.retain(|(subscriber, _)| *subscriber != id);
			}
		})
	}
}
