//! Server component payload cache and prefetcher.
//!
//! A PSC payload is a server-rendered view fragment fetched for client
//! navigation without a full page load. Payloads live in a bounded LRU
//! keyed by path plus serialized query (or an explicit key); entries
//! younger than the staleness window are served without touching the
//! network.
//!
//! Prefetching is idempotent under concurrency: an in-flight set keyed
//! like the cache prevents duplicate fetches, and prefetch failures are
//! logged and swallowed. Prefetching never surfaces errors.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::context::split_target;
use crate::error::PscError;
use crate::lru::Lru;
use crate::query::Query;

/// Default payload cache capacity.
pub const DEFAULT_PSC_CAPACITY: usize = 50;

/// Default staleness window.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_millis(60_000);

/// Content type identifying a payload request.
pub const PSC_ACCEPT: (&str, &str) = ("Accept", "application/x-pulse-psc");

/// Marker identifying the request class to the server.
pub const PSC_NAVIGATION: (&str, &str) = ("X-Pulse-Request", "navigation");

/// A transport response, fetch-like.
#[derive(Debug, Clone)]
pub struct PscResponse {
	/// Whether the status is in the success range.
	pub ok: bool,
	/// HTTP status code.
	pub status: u16,
	/// HTTP status text.
	pub status_text: String,
	/// The decoded payload body.
	pub body: Value,
}

/// The network transport used to fetch payloads.
#[async_trait(?Send)]
pub trait PscTransport {
	/// Issue a request. `headers` identifies it as a navigation request.
	async fn fetch(
		&self,
		url: &str,
		headers: &[(&str, &str)],
	) -> Result<PscResponse, PscError>;
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct PscOptions {
	/// Explicit cache key; defaults to path + serialized query.
	pub key: Option<String>,
	/// Staleness window; defaults to [`DEFAULT_STALE_TIME`].
	pub stale_time: Option<Duration>,
}

#[derive(Debug, Clone)]
struct PscEntry {
	payload: Value,
	fetched_at: Instant,
}

/// The payload cache and prefetcher.
pub struct PscClient {
	transport: Rc<dyn PscTransport>,
	cache: RefCell<Lru<String, PscEntry>>,
	inflight_prefetches: RefCell<HashSet<String>>,
	stale_time: Duration,
}

impl PscClient {
	/// Build a client over `transport` with default capacity and
	/// staleness window.
	pub fn new(transport: Rc<dyn PscTransport>) -> Self {
		Self {
			transport,
			cache: RefCell::new(Lru::new(DEFAULT_PSC_CAPACITY)),
			inflight_prefetches: RefCell::new(HashSet::new()),
			stale_time: DEFAULT_STALE_TIME,
		}
	}

	/// Override the default staleness window.
	pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
		self.stale_time = stale_time;
		self
	}

	/// Rebuild the cache with a new capacity, preserving as many existing
	/// entries (in recency order) as fit.
	pub fn configure_cache(&self, max_size: usize) {
		self.cache.borrow_mut().set_capacity(max_size);
	}

	/// Number of cached payloads.
	pub fn cached_len(&self) -> usize {
		self.cache.borrow().len()
	}

	/// Resolve the payload for `url`: a cache hit younger than the
	/// staleness window short-circuits; otherwise the payload is fetched
	/// and stored.
	pub async fn navigate(&self, url: &str, options: &PscOptions) -> Result<Value, PscError> {
		let key = cache_key(url, options);
		let stale_time = options.stale_time.unwrap_or(self.stale_time);

		let cached = {
			let mut cache = self.cache.borrow_mut();
			cache.get(&key).and_then(|entry| {
				(entry.fetched_at.elapsed() < stale_time).then(|| entry.payload.clone())
			})
		};
		if let Some(payload) = cached {
			debug!(%key, "psc cache hit");
			return Ok(payload);
		}

		let payload = self.fetch_payload(url).await?;
		self.cache.borrow_mut().insert(
			key,
			PscEntry {
				payload: payload.clone(),
				fetched_at: Instant::now(),
			},
		);
		Ok(payload)
	}

	/// Warm the cache for `url` (e.g. on link hover). Idempotent under
	/// concurrent calls for the same key; never surfaces errors.
	pub async fn prefetch(&self, url: &str, options: &PscOptions) {
		let key = cache_key(url, options);
		let stale_time = options.stale_time.unwrap_or(self.stale_time);

		let fresh = self
			.cache
			.borrow()
			.peek(&key)
			.is_some_and(|entry| entry.fetched_at.elapsed() < stale_time);
		if fresh {
			return;
		}
		if !self.inflight_prefetches.borrow_mut().insert(key.clone()) {
			// Another prefetch for this key is already on the wire.
			return;
		}

		let result = self.fetch_payload(url).await;
		self.inflight_prefetches.borrow_mut().remove(&key);
		match result {
			Ok(payload) => {
				self.cache.borrow_mut().insert(
					key,
					PscEntry {
						payload,
						fetched_at: Instant::now(),
					},
				);
			}
			Err(error) => warn!(%error, url, "psc prefetch failed"),
		}
	}

	/// Issue the network request with navigation headers, rejecting on a
	/// non-success status.
	pub async fn fetch_payload(&self, url: &str) -> Result<Value, PscError> {
		let headers = [PSC_ACCEPT, PSC_NAVIGATION];
		let response = self.transport.fetch(url, &headers).await?;
		if !response.ok {
			return Err(PscError::Status {
				status: response.status,
				status_text: response.status_text,
				url: url.to_string(),
			});
		}
		Ok(response.body)
	}
}

impl fmt::Debug for PscClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PscClient")
			.field("cached", &self.cache.borrow().len())
			.field("capacity", &self.cache.borrow().capacity())
			.field("stale_time", &self.stale_time)
			.finish()
	}
}

/// Explicit key, or path plus stable serialized query.
fn cache_key(url: &str, options: &PscOptions) -> String {
	if let Some(key) = &options.key {
		return key.clone();
	}
	let (path, raw_query) = split_target(url);
	if raw_query.is_empty() {
		return path.to_string();
	}
	let query = Query::parse(raw_query, false);
	format!("{}?{}", path, query.to_query_string())
}
