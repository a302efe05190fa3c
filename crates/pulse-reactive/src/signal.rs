//! Signal: the source primitive of the reactive graph.
//!
//! `Signal<T>` holds a value behind shared ownership. Reading it with
//! [`get()`](Signal::get) from inside an [`Effect`](crate::Effect) records
//! a dependency; writing it with [`set()`](Signal::set) or
//! [`update()`](Signal::update) re-runs every dependent effect (or
//! schedules them, inside a [`batch`](crate::batch)).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::{NodeId, try_with_runtime, with_runtime};

/// A reactive value with automatic dependency tracking.
///
/// Cloning a `Signal` is cheap and produces a second handle to the same
/// value; all clones share the underlying storage and the same identity in
/// the dependency graph.
pub struct Signal<T: 'static> {
	id: NodeId,
	value: Rc<RefCell<T>>,
}

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			value: Rc::clone(&self.value),
		}
	}
}

impl<T> Signal<T> {
	/// Create a new signal holding `value`.
	pub fn new(value: T) -> Self {
		Self {
			id: NodeId::next(),
			value: Rc::new(RefCell::new(value)),
		}
	}

	/// Get the current value, recording a dependency when called from
	/// inside an effect.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		with_runtime(|rt| rt.track_dependency(self.id));
		self.value.borrow().clone()
	}

	/// Get the current value without recording a dependency.
	///
	/// Use this for reads that must not re-trigger the surrounding effect,
	/// e.g. reading the previous route inside the navigation pipeline.
	pub fn peek(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Access the current value by reference, recording a dependency.
	///
	/// # Panics
	///
	/// Panics if the closure writes to the same signal (re-entrant borrow).
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		with_runtime(|rt| rt.track_dependency(self.id));
		f(&self.value.borrow())
	}

	/// Replace the value and notify dependents.
	pub fn set(&self, value: T) {
		*self.value.borrow_mut() = value;
		with_runtime(|rt| rt.notify(self.id));
	}

	/// Mutate the value in place and notify dependents once.
	pub fn update(&self, f: impl FnOnce(&mut T)) {
		f(&mut self.value.borrow_mut());
		with_runtime(|rt| rt.notify(self.id));
	}

	/// Identity of this signal in the dependency graph.
	pub fn id(&self) -> NodeId {
		self.id
	}
}

impl<T: 'static> Drop for Signal<T> {
	fn drop(&mut self) {
		// Last handle going away: retire the graph node. try_with guards
		// against thread-local teardown order at process exit.
		if Rc::strong_count(&self.value) == 1 {
			let _ = try_with_runtime(|rt| rt.remove_signal(self.id));
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.finish()
	}
}
