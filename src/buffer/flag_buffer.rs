//! Recency-ordered flag buffer.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::types::config::DEFAULT_FLAG_CAPACITY;
use crate::types::flags::{FlagEntry, FlagsContext};
use crate::{FlagError, FlagResult};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_FLAG_CAPACITY) {
    Some(capacity) => capacity,
    None => panic!("DEFAULT_FLAG_CAPACITY must be non-zero"),
};

/// Buffer statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Current number of entries.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Number of `set` calls.
    pub evaluations: u64,

    /// Number of `set` calls that touched a flag already present.
    pub promotions: u64,

    /// Number of entries dropped to make room for a new flag.
    pub evictions: u64,
}

impl BufferStats {
    /// Fraction of evaluations that re-touched a flag already in the buffer.
    pub fn promotion_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.promotions as f64 / self.evaluations as f64
        }
    }
}

/// Bounded buffer of the most recently set flag evaluations.
///
/// Entries are kept in recency order: the flag least recently set comes
/// first, the one most recently set comes last. Setting a flag that is
/// already present updates its result and moves it to the end; setting a
/// new flag at capacity evicts the oldest entry.
///
/// All operations take `&self` and are serialized by an internal lock, so a
/// [`snapshot`](Self::snapshot) or [`fork`](Self::fork) running on another
/// thread always sees the buffer between two whole `set` calls.
pub struct FlagBuffer {
    entries: Mutex<LruCache<String, bool>>,
    capacity: NonZeroUsize,
    evaluations: AtomicU64,
    promotions: AtomicU64,
    evictions: AtomicU64,
}

impl FlagBuffer {
    /// Creates an empty buffer.
    ///
    /// # Errors
    /// [`FlagError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> FlagResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(FlagError::InvalidCapacity(capacity))?;
        Ok(Self::with_capacity(capacity))
    }

    /// Creates an empty buffer holding up to [`DEFAULT_FLAG_CAPACITY`] flags.
    pub fn with_default_capacity() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            evaluations: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    // A panic while the lock is held can only come from the allocator, and
    // the lru operations leave the map whole before returning, so a poisoned
    // lock still guards a consistent map.
    fn entries(&self) -> MutexGuard<'_, LruCache<String, bool>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an evaluation of `name`.
    pub fn set(&self, name: &str, result: bool) {
        let mut entries = self.entries();
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        // get_mut promotes to most recent
        if let Some(value) = entries.get_mut(name) {
            *value = result;
            self.promotions.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if let Some((evicted, _)) = entries.push(name.to_string(), result) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                flag = %evicted,
                capacity = self.capacity.get(),
                "Evicted oldest flag evaluation"
            );
        }
    }

    /// Returns an independent copy of the entries, oldest first.
    pub fn snapshot(&self) -> Vec<FlagEntry> {
        let entries = self.entries();
        entries
            .iter()
            .rev()
            .map(|(flag, result)| FlagEntry::new(flag.clone(), *result))
            .collect()
    }

    /// Snapshot wrapped as the `flags` report context.
    pub fn to_context(&self) -> FlagsContext {
        FlagsContext::new(self.snapshot())
    }

    /// Returns the last result recorded for `name` without promoting it.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.entries().peek(name).copied()
    }

    /// Whether `name` is currently in the buffer. Does not promote it.
    ///
    /// ```
    /// use flagtrail::FlagBuffer;
    ///
    /// let buffer = FlagBuffer::new(1)?;
    /// buffer.set("a", true);
    /// buffer.set("b", true);
    /// assert!(!buffer.contains("a"));
    /// assert!(buffer.contains("b"));
    /// assert_eq!((buffer.len(), buffer.capacity()), (1, 1));
    /// # Ok::<(), flagtrail::FlagError>(())
    /// ```
    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains(name)
    }

    /// Number of flags currently held.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the buffer holds no flags.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Maximum number of flags, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Returns buffer statistics.
    pub fn stats(&self) -> BufferStats {
        let entries = self.entries();
        BufferStats {
            size: entries.len(),
            capacity: self.capacity.get(),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Deep copy with the same capacity and entries, in the same order.
    ///
    /// Used when an isolation scope is forked. The copy starts with fresh
    /// counters and shares nothing with `self`.
    pub fn fork(&self) -> Self {
        let entries = self.entries();
        let mut copy = LruCache::new(self.capacity);
        for (flag, result) in entries.iter().rev() {
            copy.push(flag.clone(), *result);
        }
        drop(entries);

        tracing::debug!(
            entries = copy.len(),
            capacity = self.capacity.get(),
            "Forked flag buffer"
        );

        Self {
            entries: Mutex::new(copy),
            capacity: self.capacity,
            evaluations: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }
}

impl Default for FlagBuffer {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl Clone for FlagBuffer {
    fn clone(&self) -> Self {
        self.fork()
    }
}

impl fmt::Debug for FlagBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagBuffer")
            .field("capacity", &self.capacity)
            .field("entries", &self.snapshot())
            .finish()
    }
}
