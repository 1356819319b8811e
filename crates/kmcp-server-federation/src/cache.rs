// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-(cluster, principal) client cache with single-flight construction.
//!
//! # Behaviour
//!
//! - **Keying**: entries are keyed by cluster *and* principal, never either alone
//! - **Single-flight**: concurrent misses for one key share one construction;
//!   its outcome (success or failure) is handed to every waiter
//! - **Rolling TTL**: an entry expires `ttl` after its last use
//! - **Bounded**: the least recently used entry is evicted at `max_entries`
//! - **Shutdown**: [`ClientCache::close`] drops every entry; waiters and later
//!   callers fail with [`FederationError::ManagerClosed`]
//!
//! Hits take only a shared read lock. Construction failures are not cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{FederationError, FederationResult};

/// Default time-to-live, measured from last use.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

pub const DEFAULT_CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
	pub ttl: Duration,
	pub max_entries: usize,
	pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			ttl: DEFAULT_CACHE_TTL,
			max_entries: DEFAULT_CACHE_MAX_ENTRIES,
			cleanup_interval: DEFAULT_CACHE_CLEANUP_INTERVAL,
		}
	}
}

/// Cache key. An empty cluster denotes the local cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
	pub cluster: String,
	pub principal: String,
}

impl CacheKey {
	pub fn new(cluster: impl Into<String>, principal: impl Into<String>) -> Self {
		Self {
			cluster: cluster.into(),
			principal: principal.into(),
		}
	}
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub size: usize,
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
	pub max_entries: usize,
	pub ttl: Duration,
	/// Age of the oldest entry, by creation time.
	pub oldest_entry: Option<Duration>,
	/// Age of the newest entry, by creation time.
	pub newest_entry: Option<Duration>,
	pub closed: bool,
}

struct Entry<T> {
	value: T,
	created_at: Instant,
	/// Milliseconds since the cache epoch; updated on every hit.
	last_used: AtomicU64,
}

type Flight<T> = Shared<BoxFuture<'static, FederationResult<T>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Inner<T> {
	config: CacheConfig,
	epoch: Instant,
	entries: RwLock<HashMap<CacheKey, Entry<T>>>,
	in_flight: Mutex<HashMap<CacheKey, Flight<T>>>,
	hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
	shutdown: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> Inner<T> {
	fn now_millis(&self) -> u64 {
		Instant::now().duration_since(self.epoch).as_millis() as u64
	}

	fn is_expired(&self, entry: &Entry<T>, now: u64) -> bool {
		now.saturating_sub(entry.last_used.load(Ordering::Relaxed))
			>= self.config.ttl.as_millis() as u64
	}

	async fn lookup(&self, key: &CacheKey) -> Option<T> {
		let entries = self.entries.read().await;
		let entry = entries.get(key)?;
		let now = self.now_millis();
		if self.is_expired(entry, now) {
			return None;
		}
		entry.last_used.store(now, Ordering::Relaxed);
		self.hits.fetch_add(1, Ordering::Relaxed);
		Some(entry.value.clone())
	}

	/// Returns false when the cache closed before the value could be stored.
	async fn insert(&self, key: CacheKey, value: T) -> bool {
		let mut entries = self.entries.write().await;
		if self.shutdown.is_cancelled() {
			return false;
		}

		if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
			let lru = entries
				.iter()
				.min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
				.map(|(k, _)| k.clone());
			if let Some(lru) = lru {
				entries.remove(&lru);
				self.evictions.fetch_add(1, Ordering::Relaxed);
				tracing::debug!(cluster = %lru.cluster, "evicted least recently used client");
			}
		}

		entries.insert(
			key,
			Entry {
				value,
				created_at: Instant::now(),
				last_used: AtomicU64::new(self.now_millis()),
			},
		);
		true
	}

	async fn remove_expired(&self) -> usize {
		let mut entries = self.entries.write().await;
		let now = self.now_millis();
		let before = entries.len();
		entries.retain(|_, entry| !self.is_expired(entry, now));
		let removed = before - entries.len();
		self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
		removed
	}
}

/// Concurrent cache of constructed clients.
pub struct ClientCache<T> {
	inner: Arc<Inner<T>>,
	cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + Sync + 'static> ClientCache<T> {
	/// Create a cache. When called inside a tokio runtime, a background task
	/// removes expired entries every `cleanup_interval`.
	pub fn new(config: CacheConfig) -> Self {
		let inner = Arc::new(Inner {
			config,
			epoch: Instant::now(),
			entries: RwLock::new(HashMap::new()),
			in_flight: Mutex::new(HashMap::new()),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
			shutdown: CancellationToken::new(),
		});

		let cleanup = tokio::runtime::Handle::try_current()
			.ok()
			.map(|handle| handle.spawn(cleanup_loop(Arc::clone(&inner))));

		Self {
			inner,
			cleanup: Mutex::new(cleanup),
		}
	}

	pub fn config(&self) -> &CacheConfig {
		&self.inner.config
	}

	pub fn is_closed(&self) -> bool {
		self.inner.shutdown.is_cancelled()
	}

	/// Return the cached value for `key`, constructing it with `make` on a
	/// miss.
	///
	/// Concurrent callers for the same key share one call to `make`.
	pub async fn get_or_create<F, Fut>(&self, key: CacheKey, make: F) -> FederationResult<T>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = FederationResult<T>> + Send + 'static,
	{
		if self.is_closed() {
			return Err(FederationError::ManagerClosed);
		}

		if let Some(value) = self.inner.lookup(&key).await {
			return Ok(value);
		}

		let flight = {
			let mut in_flight = lock(&self.inner.in_flight);
			match in_flight.get(&key) {
				Some(flight) => flight.clone(),
				None => {
					let flight = construct(Arc::clone(&self.inner), key.clone(), make);
					in_flight.insert(key, flight.clone());
					flight
				}
			}
		};

		tokio::select! {
			biased;
			_ = self.inner.shutdown.cancelled() => Err(FederationError::ManagerClosed),
			result = flight => result,
		}
	}

	/// Drop the entry for `key`. Returns whether one existed.
	pub async fn invalidate(&self, key: &CacheKey) -> bool {
		let removed = self.inner.entries.write().await.remove(key).is_some();
		if removed {
			self.inner.evictions.fetch_add(1, Ordering::Relaxed);
		}
		removed
	}

	/// Drop every entry for `cluster`, whoever it belongs to.
	pub async fn invalidate_cluster(&self, cluster: &str) -> usize {
		let mut entries = self.inner.entries.write().await;
		let before = entries.len();
		entries.retain(|key, _| key.cluster != cluster);
		let removed = before - entries.len();
		self.inner
			.evictions
			.fetch_add(removed as u64, Ordering::Relaxed);
		removed
	}

	/// Remove expired entries now rather than waiting for the cleanup task.
	pub async fn cleanup_expired(&self) -> usize {
		self.inner.remove_expired().await
	}

	pub async fn len(&self) -> usize {
		self.inner.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	pub async fn stats(&self) -> CacheStats {
		let entries = self.inner.entries.read().await;
		let now = Instant::now();
		let ages = entries.values().map(|e| now.duration_since(e.created_at));

		CacheStats {
			size: entries.len(),
			hits: self.inner.hits.load(Ordering::Relaxed),
			misses: self.inner.misses.load(Ordering::Relaxed),
			evictions: self.inner.evictions.load(Ordering::Relaxed),
			max_entries: self.inner.config.max_entries,
			ttl: self.inner.config.ttl,
			oldest_entry: ages.clone().max(),
			newest_entry: ages.min(),
			closed: self.is_closed(),
		}
	}

	/// Stop the cleanup task and drop every entry. Idempotent.
	#[instrument(skip(self))]
	pub async fn close(&self) {
		if self.is_closed() {
			return;
		}
		self.inner.shutdown.cancel();

		let handle = lock(&self.cleanup).take();
		if let Some(handle) = handle {
			let _ = handle.await;
		}

		let dropped = {
			let mut entries = self.inner.entries.write().await;
			let dropped = entries.len();
			entries.clear();
			dropped
		};
		lock(&self.inner.in_flight).clear();
		tracing::info!(dropped, "client cache closed");
	}
}

impl<T> Drop for ClientCache<T> {
	fn drop(&mut self) {
		self.inner.shutdown.cancel();
	}
}

fn construct<T, F, Fut>(inner: Arc<Inner<T>>, key: CacheKey, make: F) -> Flight<T>
where
	T: Clone + Send + Sync + 'static,
	F: FnOnce() -> Fut + Send + 'static,
	Fut: Future<Output = FederationResult<T>> + Send + 'static,
{
	async move {
		// A flight that started just after another one finished finds its result here.
		let outcome = match inner.lookup(&key).await {
			Some(value) => Ok(value),
			None => {
				inner.misses.fetch_add(1, Ordering::Relaxed);
				match make().await {
					Ok(value) => {
						if inner.insert(key.clone(), value.clone()).await {
							Ok(value)
						} else {
							tracing::debug!(cluster = %key.cluster, "discarding client built after close");
							Err(FederationError::ManagerClosed)
						}
					}
					Err(err) => Err(err),
				}
			}
		};
		lock(&inner.in_flight).remove(&key);
		outcome
	}
	.boxed()
	.shared()
}

async fn cleanup_loop<T: Clone + Send + Sync + 'static>(inner: Arc<Inner<T>>) {
	let mut ticker = tokio::time::interval(inner.config.cleanup_interval);
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
	// The first tick completes immediately.
	ticker.tick().await;

	loop {
		tokio::select! {
			_ = inner.shutdown.cancelled() => break,
			_ = ticker.tick() => {
				let removed = inner.remove_expired().await;
				if removed > 0 {
					tracing::debug!(removed, "removed expired clients");
				}
			}
		}
	}
}
