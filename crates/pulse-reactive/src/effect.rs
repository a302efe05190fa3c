//! Effect: a side effect that re-runs when its dependencies change.
//!
//! The closure runs once on construction. Every [`Signal::get()`]
//! (or [`Signal::with()`]) call it makes is recorded as a dependency;
//! whenever one of those signals is written, the closure runs again.
//! Dependencies are re-collected on each run, so conditional reads behave
//! correctly.
//!
//! Dropping the `Effect` handle disposes it: the closure is removed from
//! the dependency graph and never runs again.
//!
//! [`Signal::get()`]: crate::Signal::get
//! [`Signal::with()`]: crate::Signal::with

use std::cell::Cell;
use std::rc::Rc;

use crate::runtime::{NodeId, try_with_runtime, with_runtime};

/// RAII handle to a registered reactive effect.
///
/// # Example
///
/// ```
/// use pulse_reactive::{Signal, Effect};
///
/// let count = Signal::new(0);
/// let count_dep = count.clone();
/// let effect = Effect::new(move || {
/// 	let _ = count_dep.get();
/// });
///
/// count.set(1); // the closure has re-run
/// drop(effect);
/// count.set(2); // no longer observed
/// ```
pub struct Effect {
	id: NodeId,
	disposed: Rc<Cell<bool>>,
}

impl Effect {
	/// Register `f` as an effect and run it immediately.
	pub fn new<F>(mut f: F) -> Self
	where
		F: FnMut() + 'static,
	{
		let id = NodeId::next();
		let disposed = Rc::new(Cell::new(false));

		// The disposed flag shields against a scheduled run racing a
		// dispose within the same flush cycle.
		let disposed_check = Rc::clone(&disposed);
		with_runtime(|rt| {
			rt.register_effect(id, move || {
				if !disposed_check.get() {
					f();
				}
			});
			rt.run_effect(id);
		});

		Self { id, disposed }
	}

	/// Identity of this effect in the dependency graph.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Stop the effect: it will never run again and its dependency edges
	/// are removed. Idempotent; also called on drop.
	pub fn dispose(&self) {
		self.disposed.set(true);
		let _ = try_with_runtime(|rt| rt.remove_effect(self.id));
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		self.dispose();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Signal, batch};
	use std::cell::RefCell;

	#[test]
	fn test_effect_runs_immediately() {
		let runs = Rc::new(Cell::new(0u32));
		let runs_clone = Rc::clone(&runs);
		let _effect = Effect::new(move || {
			runs_clone.set(runs_clone.get() + 1);
		});
		assert_eq!(runs.get(), 1);
	}

	#[test]
	fn test_effect_reruns_on_change() {
		let signal = Signal::new(0);
		let seen = Rc::new(RefCell::new(Vec::new()));

		let signal_dep = signal.clone();
		let seen_clone = Rc::clone(&seen);
		let _effect = Effect::new(move || {
			seen_clone.borrow_mut().push(signal_dep.get());
		});

		signal.set(10);
		signal.set(20);
		assert_eq!(*seen.borrow(), vec![0, 10, 20]);
	}

	#[test]
	fn test_effect_with_multiple_signals() {
		let a = Signal::new(1);
		let b = Signal::new(2);
		let sum = Rc::new(Cell::new(0));

		let a_dep = a.clone();
		let b_dep = b.clone();
		let sum_clone = Rc::clone(&sum);
		let _effect = Effect::new(move || {
			sum_clone.set(a_dep.get() + b_dep.get());
		});

		assert_eq!(sum.get(), 3);
		a.set(10);
		assert_eq!(sum.get(), 12);
		b.set(20);
		assert_eq!(sum.get(), 30);
	}

	#[test]
	fn test_dispose_stops_reruns() {
		let signal = Signal::new(0);
		let runs = Rc::new(Cell::new(0u32));

		let signal_dep = signal.clone();
		let runs_clone = Rc::clone(&runs);
		let effect = Effect::new(move || {
			let _ = signal_dep.get();
			runs_clone.set(runs_clone.get() + 1);
		});

		effect.dispose();
		signal.set(1);
		assert_eq!(runs.get(), 1);
	}

	#[test]
	fn test_drop_cleans_up() {
		let signal = Signal::new(0);
		let runs = Rc::new(Cell::new(0u32));

		{
			let signal_dep = signal.clone();
			let runs_clone = Rc::clone(&runs);
			let _effect = Effect::new(move || {
				let _ = signal_dep.get();
				runs_clone.set(runs_clone.get() + 1);
			});
		}

		signal.set(1);
		assert_eq!(runs.get(), 1);
	}

	#[test]
	fn test_dependencies_recollected_each_run() {
		let gate = Signal::new(true);
		let left = Signal::new(0);
		let right = Signal::new(0);
		let runs = Rc::new(Cell::new(0u32));

		let gate_dep = gate.clone();
		let left_dep = left.clone();
		let right_dep = right.clone();
		let runs_clone = Rc::clone(&runs);
		let _effect = Effect::new(move || {
			if gate_dep.get() {
				let _ = left_dep.get();
			} else {
				let _ = right_dep.get();
			}
			runs_clone.set(runs_clone.get() + 1);
		});
		assert_eq!(runs.get(), 1);

		// Observed branch: left.
		right.set(1);
		assert_eq!(runs.get(), 1, "untaken branch must not trigger");
		left.set(1);
		assert_eq!(runs.get(), 2);

		// Switch branches; left must stop triggering.
		gate.set(false);
		assert_eq!(runs.get(), 3);
		left.set(2);
		assert_eq!(runs.get(), 3);
		right.set(2);
		assert_eq!(runs.get(), 4);
	}

	#[test]
	fn test_batched_writes_rerun_once() {
		let a = Signal::new(0);
		let b = Signal::new(0);
		let runs = Rc::new(Cell::new(0u32));

		let a_dep = a.clone();
		let b_dep = b.clone();
		let runs_clone = Rc::clone(&runs);
		let _effect = Effect::new(move || {
			let _ = (a_dep.get(), b_dep.get());
			runs_clone.set(runs_clone.get() + 1);
		});

		batch(|| {
			a.set(1);
			b.set(1);
		});
		assert_eq!(runs.get(), 2);
	}
}
