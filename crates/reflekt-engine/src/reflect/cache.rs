//! Accessor cache
//!
//! Three concurrent tables hold resolved member handles and property
//! groupings: retrieval (reads and quick calls), mutation (writes) and
//! grouping (property pairs between two types). Entries are never
//! invalidated one by one; the whole cache is cleared by the eviction
//! ticker every interval, or on demand with [`CacheService::evict_all`].
//!
//! The ticker is a dedicated thread parked on a condvar with a deadline,
//! so shutdown wakes it immediately instead of waiting out the interval.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::access::MemberHandle;
use super::grouping::{GroupingKey, PropertyPair};
use crate::types::{TypeDescriptor, TypeToken, ValueType};

/// Default time between full evictions
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(300);

// ============================================================================
// Keys
// ============================================================================

/// What a cache key resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Value access (field or accessor method)
    Member,
    /// Dynamic method call
    Call,
}

/// Identity of a cached resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    owner: TypeToken,
    kind: KeyKind,
    name: String,
    param: Option<ValueType>,
}

impl CacheKey {
    /// Value access keyed by member name only
    pub fn member(owner: &TypeDescriptor, name: &str) -> Self {
        Self {
            owner: owner.token(),
            kind: KeyKind::Member,
            name: name.to_string(),
            param: None,
        }
    }

    /// Value access through a mutator taking `param`
    pub fn mutator(owner: &TypeDescriptor, name: &str, param: ValueType) -> Self {
        Self {
            param: Some(param),
            ..Self::member(owner, name)
        }
    }

    /// Method call with an optional argument type
    pub fn call(owner: &TypeDescriptor, method: &str, param: Option<ValueType>) -> Self {
        Self {
            owner: owner.token(),
            kind: KeyKind::Call,
            name: method.to_string(),
            param,
        }
    }

    /// Token of the owning type
    pub fn owner(&self) -> TypeToken {
        self.owner
    }

    /// Key kind
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Member or method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type, if any
    pub fn param(&self) -> Option<&ValueType> {
        self.param.as_ref()
    }
}

// ============================================================================
// Tables
// ============================================================================

struct CacheTables {
    retrieval: DashMap<CacheKey, Arc<MemberHandle>>,
    mutation: DashMap<CacheKey, Arc<MemberHandle>>,
    groupings: DashMap<GroupingKey, Arc<Vec<PropertyPair>>>,
    evictions: AtomicU64,
}

impl CacheTables {
    fn new() -> Self {
        Self {
            retrieval: DashMap::new(),
            mutation: DashMap::new(),
            groupings: DashMap::new(),
            evictions: AtomicU64::new(0),
        }
    }

    fn evict_all(&self) {
        let cleared = self.retrieval.len() + self.mutation.len() + self.groupings.len();
        self.retrieval.clear();
        self.mutation.clear();
        self.groupings.clear();
        let count = self.evictions.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(cleared, evictions = count, "accessor cache evicted");
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries in the retrieval table
    pub retrieval_entries: usize,
    /// Entries in the mutation table
    pub mutation_entries: usize,
    /// Entries in the grouping table
    pub grouping_entries: usize,
    /// Full evictions performed so far
    pub evictions: u64,
}

// ============================================================================
// Eviction ticker
// ============================================================================

struct EvictionTicker {
    /// Held by the ticker thread except while it waits
    lock: Mutex<()>,
    /// Wakes the ticker for shutdown
    notify: Condvar,
    /// Shutdown signal
    shutdown: AtomicBool,
    /// Thread handle while running
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EvictionTicker {
    fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            notify: Condvar::new(),
            shutdown: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    fn run_loop(&self, tables: &CacheTables, interval: Duration) {
        let mut guard = self.lock.lock();
        let mut deadline = Instant::now() + interval;

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            if self.notify.wait_until(&mut guard, deadline).timed_out() {
                if self.shutdown.load(Ordering::Acquire) {
                    break;
                }
                tables.evict_all();
                deadline = Instant::now() + interval;
            }
        }

        debug!("eviction ticker stopped");
    }

    fn signal_shutdown(&self) {
        // Taking the lock orders the store before the ticker's next wait
        let _guard = self.lock.lock();
        self.shutdown.store(true, Ordering::Release);
        self.notify.notify_all();
    }
}

// ============================================================================
// Service
// ============================================================================

/// Owner of the accessor cache tables and their eviction ticker
///
/// Shared as `Arc<CacheService>` by every resolver that should see the same
/// cache. Dropping the service stops the ticker.
pub struct CacheService {
    tables: Arc<CacheTables>,
    ticker: Arc<EvictionTicker>,
    interval: Duration,
}

impl CacheService {
    /// Service with the default five-minute interval
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_EVICTION_INTERVAL)
    }

    /// Service with a custom eviction interval
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            tables: Arc::new(CacheTables::new()),
            ticker: Arc::new(EvictionTicker::new()),
            interval,
        }
    }

    /// Eviction interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the eviction ticker; no-op if it is already running
    pub fn init(&self) -> std::io::Result<()> {
        let mut handle = self.ticker.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        self.ticker.shutdown.store(false, Ordering::Release);
        let ticker = Arc::clone(&self.ticker);
        let tables = Arc::clone(&self.tables);
        let interval = self.interval;

        *handle = Some(
            thread::Builder::new()
                .name("reflekt-cache-evictor".to_string())
                .spawn(move || ticker.run_loop(&tables, interval))?,
        );
        debug!(interval_ms = interval.as_millis() as u64, "eviction ticker started");
        Ok(())
    }

    /// Stop the eviction ticker and wait for its thread to exit
    pub fn shutdown(&self) {
        let Some(handle) = self.ticker.handle.lock().take() else {
            return;
        };
        self.ticker.signal_shutdown();
        if handle.join().is_err() {
            warn!("eviction ticker thread panicked");
        }
    }

    /// Whether the eviction ticker is running
    pub fn is_running(&self) -> bool {
        self.ticker.handle.lock().is_some()
    }

    /// Clear every table now
    pub fn evict_all(&self) {
        self.tables.evict_all();
    }

    /// Cached read or call handle
    pub fn retrieval(&self, key: &CacheKey) -> Option<Arc<MemberHandle>> {
        self.tables.retrieval.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Cache a read or call handle; last write wins
    pub fn put_retrieval(&self, key: CacheKey, handle: MemberHandle) -> Arc<MemberHandle> {
        let handle = Arc::new(handle);
        self.tables.retrieval.insert(key, Arc::clone(&handle));
        handle
    }

    /// Cached write handle
    pub fn mutation(&self, key: &CacheKey) -> Option<Arc<MemberHandle>> {
        self.tables.mutation.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Cache a write handle; last write wins
    pub fn put_mutation(&self, key: CacheKey, handle: MemberHandle) -> Arc<MemberHandle> {
        let handle = Arc::new(handle);
        self.tables.mutation.insert(key, Arc::clone(&handle));
        handle
    }

    /// Cached property grouping
    pub fn grouping(&self, key: &GroupingKey) -> Option<Arc<Vec<PropertyPair>>> {
        self.tables.groupings.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Cache a property grouping; last write wins
    pub fn put_grouping(&self, key: GroupingKey, pairs: Vec<PropertyPair>) -> Arc<Vec<PropertyPair>> {
        let pairs = Arc::new(pairs);
        self.tables.groupings.insert(key, Arc::clone(&pairs));
        pairs
    }

    /// Current occupancy
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            retrieval_entries: self.tables.retrieval.len(),
            mutation_entries: self.tables.mutation.len(),
            grouping_entries: self.tables.groupings.len(),
            evictions: self.tables.evictions.load(Ordering::Acquire),
        }
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
