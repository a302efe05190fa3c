//! Fine-grained reactive primitives for Pulse.
//!
//! This crate provides the change-tracking building blocks the rest of the
//! framework observes state through:
//!
//! - [`Signal<T>`]: a shared value that records which effects read it and
//!   notifies them when it changes.
//! - [`Effect`]: a side effect that re-runs automatically whenever any
//!   signal it read during its last run changes.
//! - [`batch`]: groups several signal writes into one update cycle so
//!   effects observe either the state before the batch or the state after
//!   it, never something in between.
//!
//! ## Architecture
//!
//! Reactivity is pull-based, in the style of Solid and Leptos: while an
//! effect executes it sits on an observer stack, and every `Signal::get()`
//! call records a dependency edge against the top observer. The runtime
//! lives in thread-local storage, so all primitives are single-threaded
//! (`Rc`-shared) and need no locking.
//!
//! ## Invariants
//!
//! 1. An effect re-runs at most once per update cycle, no matter how many
//!    of its dependencies changed in that cycle.
//! 2. Dependencies are re-collected on every run; signals read only in a
//!    previous run stop triggering the effect.
//! 3. Dropping (or disposing) an [`Effect`] removes it from the dependency
//!    graph before the next notification.
//! 4. `peek()` never records a dependency.

pub mod effect;
pub mod runtime;
pub mod signal;

pub use effect::Effect;
pub use runtime::{NodeId, batch};
pub use signal::Signal;
