//! Renderable view nodes and mount containers for Pulse.
//!
//! Route handlers produce [`View`] values; the router's outlet mounts them
//! into a [`Container`]. The types here are deliberately small: they model
//! just enough of a DOM-like tree to build, swap and assert on rendered
//! output. Rendering semantics beyond string serialization live in the
//! platform backends.

pub mod container;
pub mod view;

pub use container::Container;
pub use view::{Element, View};
