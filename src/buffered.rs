//! Buffered thread-safe wrapper around a containment index.
//!
//! Raw index backends are single-threaded. [`BufferedIndex`] makes one
//! shareable: readers proceed concurrently under a read lock, writers
//! batch through an add-buffer, and a background worker folds the buffer
//! into the index once enough additions pile up, paying the write-lock
//! cost once per batch instead of once per entry.
//!
//! Readers see buffered entries immediately: `contains`, counts and query
//! iterators consult the buffer alongside the wrapped index. An entry
//! added by a thread is visible to that thread's next query, and to any
//! other thread once it acquires the read lock; no total order across
//! concurrent additions is promised.
//!
//! # Lock order
//! The index lock is always taken before the buffer lock. The worker
//! waits on the flush condvar holding only the buffer lock and releases
//! it before taking the write lock, so the pair can never deadlock.
//!
//! # Iterator stability
//! Query iterators come from a [`ReadHandle`] and borrow it, so the read
//! lock is held for as long as any iterator is alive and released when
//! the handle drops. Dropping the handle between query and iteration is
//! rejected at compile time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fxhash::FxHashSet;
use parking_lot::{Condvar, Mutex, RwLock, RwLockReadGuard};

use crate::error::Result;
use crate::index::{check_width, ContainmentIndex, IndexEntry};

/// Lazy sequence of owned entries produced by [`ReadHandle`] queries.
pub type OwnedEntries<'a, C> = Box<dyn Iterator<Item = C> + 'a>;

/// Pending additions not yet folded into the wrapped index.
///
/// `pending` mirrors `entries.len()`; it is the hand-rolled analogue of a
/// semaphore permit count, advanced on genuine insertion and drained on
/// flush. The two diverging means a lost or duplicated permit, which is a
/// fatal bug, not a recoverable condition.
struct Buffer<C> {
    entries: FxHashSet<C>,
    pending: usize,
}

struct Shared<C, I> {
    index: RwLock<I>,
    buffer: Mutex<Buffer<C>>,
    flush_ready: Condvar,
    flush_threshold: usize,
    shutdown: AtomicBool,
}

/// Thread-safe containment index with batched writes.
///
/// # Example
/// ```rust
/// use containment_index::{BufferedIndex, CacheEntry, ContainmentIndex,
///                         SimpleBitSetIndex, Universe};
///
/// let universe = Universe::new(0u32..16).unwrap();
/// let index = BufferedIndex::new(SimpleBitSetIndex::new(universe.len()), 64);
///
/// let entry = CacheEntry::new(&universe, [1u32, 2], "e").unwrap();
/// index.add(entry.clone()).unwrap();
/// assert!(index.contains(&entry));
///
/// let handle = index.read();
/// let query = CacheEntry::new(&universe, [1u32, 2, 3], "q").unwrap();
/// assert_eq!(handle.num_subsets(&query).unwrap(), 1);
/// ```
pub struct BufferedIndex<C, I> {
    shared: Arc<Shared<C, I>>,
    worker: Option<JoinHandle<()>>,
}

impl<C, I> BufferedIndex<C, I>
where
    C: IndexEntry + Send + Sync + 'static,
    I: ContainmentIndex<C> + Send + Sync + 'static,
{
    /// Wrap an index, flushing the add-buffer whenever it reaches
    /// `flush_threshold` pending entries.
    ///
    /// A threshold of zero behaves like one. Keep the threshold modest:
    /// every read operation scans the buffer linearly.
    pub fn new(index: I, flush_threshold: usize) -> Self {
        let shared = Arc::new(Shared {
            index: RwLock::new(index),
            buffer: Mutex::new(Buffer {
                entries: FxHashSet::default(),
                pending: 0,
            }),
            flush_ready: Condvar::new(),
            flush_threshold: flush_threshold.max(1),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("containment-flusher".into())
            .spawn(move || flusher_loop(worker_shared))
            .expect("failed to spawn flusher thread");
        BufferedIndex {
            shared,
            worker: Some(worker),
        }
    }

    /// Insert an entry.
    ///
    /// Runs under the read lock: the entry lands in the add-buffer, where
    /// every reader already sees it, and reaches the wrapped index with
    /// the next flush. Entries already present in index or buffer are
    /// left alone.
    pub fn add(&self, entry: C) -> Result<()> {
        let index = self.shared.index.read();
        check_width(index.universe_len(), &entry)?;
        if index.contains(&entry) {
            return Ok(());
        }
        let mut buffer = self.shared.buffer.lock();
        if buffer.entries.insert(entry) {
            buffer.pending += 1;
            if buffer.pending >= self.shared.flush_threshold {
                self.shared.flush_ready.notify_one();
            }
        }
        Ok(())
    }

    /// Remove the entry equal to the operand, wherever it currently
    /// lives. Absent entries are not an error.
    pub fn remove(&self, entry: &C) -> Result<()> {
        let mut index = self.shared.index.write();
        let from_buffer = {
            let mut buffer = self.shared.buffer.lock();
            if buffer.entries.remove(entry) {
                assert!(
                    buffer.pending > 0,
                    "add buffer diverged from its pending counter"
                );
                buffer.pending -= 1;
                true
            } else {
                false
            }
        };
        if !from_buffer {
            index.remove(entry)?;
        }
        Ok(())
    }

    /// True if an entry equal to the operand is present in the index or
    /// the add-buffer.
    pub fn contains(&self, entry: &C) -> bool {
        let index = self.shared.index.read();
        index.contains(entry) || self.shared.buffer.lock().entries.contains(entry)
    }

    /// Number of entries, buffered ones included.
    ///
    /// The add guard keeps buffer and index disjoint, so this is a plain
    /// sum.
    pub fn len(&self) -> usize {
        let index = self.shared.index.read();
        index.len() + self.shared.buffer.lock().entries.len()
    }

    /// True if neither the index nor the buffer holds an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire the read lock for querying.
    ///
    /// The handle pins the wrapped index; keep it alive while consuming
    /// any iterator obtained from it.
    pub fn read(&self) -> ReadHandle<'_, C, I> {
        ReadHandle {
            index: self.shared.index.read(),
            shared: &self.shared,
        }
    }

    /// Drain the add-buffer into the wrapped index immediately.
    ///
    /// Blocks on the write lock. Useful as a quiesce point, for example
    /// before comparing against an expected final state.
    pub fn flush_now(&self) {
        flush(&self.shared);
    }
}

impl<C, I> Drop for BufferedIndex<C, I> {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        // Wake the worker under the buffer lock so the signal cannot fall
        // between its condition check and its wait.
        {
            let _buffer = self.shared.buffer.lock();
            self.shared.flush_ready.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Read-locked view of a [`BufferedIndex`].
///
/// Queries yield owned entries: the wrapped index's lazy results cloned
/// item by item, followed by a snapshot of the matching buffered entries.
/// The buffer and the index are disjoint, so nothing repeats.
pub struct ReadHandle<'a, C, I> {
    index: RwLockReadGuard<'a, I>,
    shared: &'a Shared<C, I>,
}

impl<C, I> ReadHandle<'_, C, I>
where
    C: IndexEntry,
    I: ContainmentIndex<C>,
{
    /// True if an entry equal to the operand is present.
    pub fn contains(&self, entry: &C) -> bool {
        self.index.contains(entry) || self.shared.buffer.lock().entries.contains(entry)
    }

    /// Number of entries, buffered ones included.
    pub fn len(&self) -> usize {
        self.index.len() + self.shared.buffer.lock().entries.len()
    }

    /// True when no entry is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries whose set is a subset of the query's set.
    pub fn subsets(&self, query: &C) -> Result<OwnedEntries<'_, C>> {
        let inner = self.index.subsets(query)?;
        let snapshot = self.matching_buffered(query, Direction::Subsets);
        Ok(Box::new(inner.cloned().chain(snapshot)))
    }

    /// Number of entries `subsets` would yield.
    pub fn num_subsets(&self, query: &C) -> Result<usize> {
        let from_index = self.index.num_subsets(query)?;
        Ok(from_index + self.matching_buffered(query, Direction::Subsets).len())
    }

    /// All entries whose set is a superset of the query's set.
    pub fn supersets(&self, query: &C) -> Result<OwnedEntries<'_, C>> {
        let inner = self.index.supersets(query)?;
        let snapshot = self.matching_buffered(query, Direction::Supersets);
        Ok(Box::new(inner.cloned().chain(snapshot)))
    }

    /// Number of entries `supersets` would yield.
    pub fn num_supersets(&self, query: &C) -> Result<usize> {
        let from_index = self.index.num_supersets(query)?;
        Ok(from_index + self.matching_buffered(query, Direction::Supersets).len())
    }

    /// Every entry, each exactly once.
    pub fn iter_all(&self) -> OwnedEntries<'_, C> {
        let snapshot: Vec<C> = self.shared.buffer.lock().entries.iter().cloned().collect();
        Box::new(self.index.iter_all().cloned().chain(snapshot))
    }

    fn matching_buffered(&self, query: &C, direction: Direction) -> Vec<C> {
        let buffer = self.shared.buffer.lock();
        buffer
            .entries
            .iter()
            .filter(|buffered| match direction {
                Direction::Subsets => {
                    buffered.fingerprint().is_subset_of(query.fingerprint())
                }
                Direction::Supersets => {
                    query.fingerprint().is_subset_of(buffered.fingerprint())
                }
            })
            .cloned()
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Subsets,
    Supersets,
}

fn flusher_loop<C, I>(shared: Arc<Shared<C, I>>)
where
    C: IndexEntry,
    I: ContainmentIndex<C>,
{
    tracing::debug!("add-buffer flusher started");
    loop {
        let exiting = {
            let mut buffer = shared.buffer.lock();
            while buffer.pending < shared.flush_threshold
                && !shared.shutdown.load(Ordering::Acquire)
            {
                shared.flush_ready.wait(&mut buffer);
            }
            shared.shutdown.load(Ordering::Acquire)
        };
        flush(&shared);
        if exiting {
            tracing::debug!("add-buffer flusher exiting");
            return;
        }
    }
}

/// Move every buffered entry into the wrapped index under the write lock.
fn flush<C, I>(shared: &Shared<C, I>)
where
    C: IndexEntry,
    I: ContainmentIndex<C>,
{
    let mut index = shared.index.write();
    let drained: Vec<C> = {
        let mut buffer = shared.buffer.lock();
        buffer.pending = 0;
        buffer.entries.drain().collect()
    };
    if drained.is_empty() {
        return;
    }
    let count = drained.len();
    for entry in drained {
        if let Err(error) = index.add(entry) {
            // Entries are validated before they enter the buffer, so this
            // is unreachable short of an index bug.
            tracing::warn!(%error, "wrapped index rejected a buffered entry");
        }
    }
    tracing::debug!(flushed = count, "flushed add buffer into index");
}
