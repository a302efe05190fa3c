//! Shared fixtures for the integration suite.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use pulse_router::{PscError, PscResponse, PscTransport, ScrollPosition, Viewport};
use serde_json::json;

/// Viewport that reports a programmable offset and records every scroll.
#[derive(Default)]
pub struct RecordingViewport {
	/// The offset `offset()` reports.
	pub offset: Cell<ScrollPosition>,
	/// Every `scroll_to` target, in order.
	pub scrolls: RefCell<Vec<ScrollPosition>>,
	/// Every selector scrolled into view, in order.
	pub selectors: RefCell<Vec<String>>,
}

impl RecordingViewport {
	pub fn shared() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// The most recent `scroll_to` target.
	pub fn last_scroll(&self) -> Option<ScrollPosition> {
		self.scrolls.borrow().last().copied()
	}
}

impl Viewport for RecordingViewport {
	fn offset(&self) -> ScrollPosition {
		self.offset.get()
	}

	fn scroll_to(&self, position: ScrollPosition) {
		self.scrolls.borrow_mut().push(position);
	}

	fn scroll_into_view(&self, selector: &str) -> Result<bool, String> {
		self.selectors.borrow_mut().push(selector.to_string());
		Ok(true)
	}
}

/// Transport serving `{"url": <requested url>}` and counting calls.
#[derive(Default)]
pub struct CountingTransport {
	pub calls: Cell<u32>,
}

impl CountingTransport {
	pub fn shared() -> Rc<Self> {
		Rc::new(Self::default())
	}
}

#[async_trait(?Send)]
impl PscTransport for CountingTransport {
	async fn fetch(
		&self,
		url: &str,
		_headers: &[(&str, &str)],
	) -> Result<PscResponse, PscError> {
		self.calls.set(self.calls.get() + 1);
		Ok(PscResponse {
			ok: true,
			status: 200,
			status_text: "OK".into(),
			body: json!({ "url": url }),
		})
	}
}
