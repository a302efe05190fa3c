//! Reactive runtime: dependency graph, observer stack, and update batching.
//!
//! The runtime is stored in thread-local storage and shared by every
//! [`Signal`](crate::Signal) and [`Effect`](crate::Effect) on the thread.
//! Signals notify it on writes, effects register their closures with it,
//! and [`batch`] defers effect execution until the outermost batch exits.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Unique identifier for reactive nodes (signals and effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Allocate a fresh id.
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

type EffectFn = Rc<RefCell<dyn FnMut()>>;

/// Per-thread reactive state.
///
/// Not constructed directly; access goes through [`with_runtime`].
pub(crate) struct Runtime {
	/// Stack of currently executing effects. `Signal::get()` records a
	/// dependency against the top entry.
	observers: RefCell<Vec<NodeId>>,
	/// signal id -> effects that read it during their last run.
	subscribers: RefCell<BTreeMap<NodeId, BTreeSet<NodeId>>>,
	/// effect id -> signals it read during its last run.
	dependencies: RefCell<BTreeMap<NodeId, BTreeSet<NodeId>>>,
	/// Registered effect closures.
	effects: RefCell<BTreeMap<NodeId, EffectFn>>,
	/// Effects scheduled to run, in notification order, deduplicated.
	pending: RefCell<Vec<NodeId>>,
	/// Depth of nested `batch()` calls.
	batch_depth: Cell<u32>,
	/// Whether a flush is currently draining `pending`.
	flushing: Cell<bool>,
}

impl Runtime {
	fn new() -> Self {
		Self {
			observers: RefCell::new(Vec::new()),
			subscribers: RefCell::new(BTreeMap::new()),
			dependencies: RefCell::new(BTreeMap::new()),
			effects: RefCell::new(BTreeMap::new()),
			pending: RefCell::new(Vec::new()),
			batch_depth: Cell::new(0),
			flushing: Cell::new(false),
		}
	}

	/// Record that the currently executing effect (if any) read `signal`.
	pub(crate) fn track_dependency(&self, signal: NodeId) {
		let Some(&observer) = self.observers.borrow().last() else {
			return;
		};
		self.subscribers
			.borrow_mut()
			.entry(signal)
			.or_default()
			.insert(observer);
		self.dependencies
			.borrow_mut()
			.entry(observer)
			.or_default()
			.insert(signal);
	}

	/// Drop all dependency edges of `observer` before it re-runs.
	fn clear_dependencies(&self, observer: NodeId) {
		if let Some(signals) = self.dependencies.borrow_mut().remove(&observer) {
			let mut subscribers = self.subscribers.borrow_mut();
			for signal in signals {
				if let Some(set) = subscribers.get_mut(&signal) {
					set.remove(&observer);
				}
			}
		}
	}

	/// Schedule every effect subscribed to `signal`, flushing immediately
	/// unless a batch or another flush is in progress.
	pub(crate) fn notify(&self, signal: NodeId) {
		let targets: Vec<NodeId> = self
			.subscribers
			.borrow()
			.get(&signal)
			.map(|set| set.iter().copied().collect())
			.unwrap_or_default();
		{
			let mut pending = self.pending.borrow_mut();
			for target in targets {
				if !pending.contains(&target) {
					pending.push(target);
				}
			}
		}
		if self.batch_depth.get() == 0 && !self.flushing.get() {
			self.flush();
		}
	}

	/// Run scheduled effects until no more are pending. Effects scheduled
	/// while flushing (an effect writing a signal) run in the same cycle.
	pub(crate) fn flush(&self) {
		self.flushing.set(true);
		loop {
			let next = {
				let mut pending = self.pending.borrow_mut();
				if pending.is_empty() {
					break;
				}
				pending.remove(0)
			};
			self.run_effect(next);
		}
		self.flushing.set(false);
	}

	/// Execute one effect: clear its old dependencies, push it on the
	/// observer stack, call its closure, pop.
	pub(crate) fn run_effect(&self, id: NodeId) {
		let Some(effect) = self.effects.borrow().get(&id).cloned() else {
			return;
		};
		self.clear_dependencies(id);
		self.observers.borrow_mut().push(id);
		// No runtime borrow is held here: the closure may freely read and
		// write signals, or even register new effects.
		(effect.borrow_mut())();
		self.observers.borrow_mut().pop();
	}

	pub(crate) fn register_effect(&self, id: NodeId, f: impl FnMut() + 'static) {
		self.effects
			.borrow_mut()
			.insert(id, Rc::new(RefCell::new(f)) as EffectFn);
	}

	pub(crate) fn remove_effect(&self, id: NodeId) {
		self.effects.borrow_mut().remove(&id);
		self.clear_dependencies(id);
		self.pending.borrow_mut().retain(|pending| *pending != id);
	}

	pub(crate) fn remove_signal(&self, id: NodeId) {
		self.subscribers.borrow_mut().remove(&id);
	}
}

thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Run `f` with the thread's runtime.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
	RUNTIME.with(f)
}

/// Like [`with_runtime`], but returns `None` if the thread-local storage
/// has already been torn down (drop order during thread exit).
pub(crate) fn try_with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> Option<R> {
	RUNTIME.try_with(f).ok()
}

/// Group several signal writes into a single update cycle.
///
/// Inside the closure, `Signal::set()`/`update()` only schedule dependent
/// effects; they run once, after the outermost batch exits. Observers
/// therefore never see a partially-updated combination of fields.
///
/// Batches nest: only the outermost one flushes.
///
/// # Example
///
/// ```
/// use pulse_reactive::{Signal, Effect, batch};
///
/// let x = Signal::new(1);
/// let y = Signal::new(2);
/// let x2 = x.clone();
/// let y2 = y.clone();
/// let _effect = Effect::new(move || {
/// 	let _ = (x2.get(), y2.get());
/// });
///
/// batch(|| {
/// 	x.set(10);
/// 	y.set(20);
/// 	// The effect has not re-run yet.
/// });
/// // Now it has, exactly once.
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
	with_runtime(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
	let result = f();
	with_runtime(|rt| {
		let depth = rt.batch_depth.get() - 1;
		rt.batch_depth.set(depth);
		if depth == 0 && !rt.flushing.get() {
			rt.flush();
		}
	});
	result
}
