//! Mount containers.
//!
//! A [`Container`] is the target the router's outlet writes into. It holds
//! a list of mounted [`View`]s behind shared ownership, so the outlet, the
//! application and tests can all observe the same mount point.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::view::View;

/// A shared mount point for views.
///
/// Clones are handles to the same children list.
#[derive(Clone, Default)]
pub struct Container {
	children: Rc<RefCell<Vec<View>>>,
}

impl Container {
	/// Create an empty container.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace all children with the given views.
	pub fn replace_children(&self, views: Vec<View>) {
		*self.children.borrow_mut() = views;
	}

	/// Replace all children with a single view.
	pub fn replace(&self, view: View) {
		self.replace_children(vec![view]);
	}

	/// Append a child view.
	pub fn append_child(&self, view: View) {
		self.children.borrow_mut().push(view);
	}

	/// Remove all children.
	pub fn clear(&self) {
		self.children.borrow_mut().clear();
	}

	/// Snapshot of the current children.
	pub fn children(&self) -> Vec<View> {
		self.children.borrow().clone()
	}

	/// Number of mounted children.
	pub fn len(&self) -> usize {
		self.children.borrow().len()
	}

	/// Whether nothing is mounted.
	pub fn is_empty(&self) -> bool {
		self.children.borrow().is_empty()
	}

	/// Serialize all children to an HTML string.
	pub fn render_to_string(&self) -> String {
		self.children
			.borrow()
			.iter()
			.map(View::render_to_string)
			.collect()
	}
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Container")
			.field("children", &self.children.borrow().len())
			.finish()
	}
}
