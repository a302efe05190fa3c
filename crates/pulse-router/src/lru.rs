//! Bounded least-recently-used map.
//!
//! Backs both the scroll position store and the server component payload
//! cache. Reads refresh recency (`get` is a *use*); inserting beyond
//! capacity evicts the least recently used entry, not the oldest inserted
//! one.
//!
//! Entries are kept in a plain vector ordered from least to most recently
//! used. The capacities involved (tens of entries) make linear scans
//! cheaper than pointer-chasing a linked structure.

/// A capacity-bounded LRU map.
#[derive(Debug, Clone)]
pub struct Lru<K, V> {
	capacity: usize,
	/// Front = least recently used, back = most recently used.
	entries: Vec<(K, V)>,
}

impl<K: PartialEq + Clone, V> Lru<K, V> {
	/// Create a store that holds at most `capacity` entries.
	///
	/// A zero capacity is clamped to one; a cache that can never hold an
	/// entry has no sensible behavior.
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity: capacity.max(1),
			entries: Vec::new(),
		}
	}

	/// Maximum number of entries.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Current number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the store is empty.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Look up `key`, marking the entry as most recently used.
	pub fn get(&mut self, key: &K) -> Option<&V> {
		let index = self.entries.iter().position(|(k, _)| k == key)?;
		let entry = self.entries.remove(index);
		self.entries.push(entry);
		self.entries.last().map(|(_, v)| v)
	}

	/// Look up `key` without touching recency.
	pub fn peek(&self, key: &K) -> Option<&V> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	/// Whether `key` is present. Does not touch recency.
	pub fn contains_key(&self, key: &K) -> bool {
		self.entries.iter().any(|(k, _)| k == key)
	}

	/// Insert or replace `key`, marking it most recently used and evicting
	/// the least recently used entry if over capacity.
	///
	/// Returns the evicted entry, if any.
	pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
		if let Some(index) = self.entries.iter().position(|(k, _)| k == &key) {
			self.entries.remove(index);
		}
		self.entries.push((key, value));
		if self.entries.len() > self.capacity {
			Some(self.entries.remove(0))
		} else {
			None
		}
	}

	/// Remove `key`, returning its value.
	pub fn remove(&mut self, key: &K) -> Option<V> {
		let index = self.entries.iter().position(|(k, _)| k == key)?;
		Some(self.entries.remove(index).1)
	}

	/// Change the capacity, dropping least-recently-used entries that no
	/// longer fit while preserving the order of the survivors.
	pub fn set_capacity(&mut self, capacity: usize) {
		self.capacity = capacity.max(1);
		if self.entries.len() > self.capacity {
			let excess = self.entries.len() - self.capacity;
			self.entries.drain(..excess);
		}
	}

	/// Iterate entries from least to most recently used.
	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		self.entries.iter().map(|(k, v)| (k, v))
	}
}
