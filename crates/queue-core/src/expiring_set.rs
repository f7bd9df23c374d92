//! A keyed TTL map with best-effort background eviction (§4.4), used by the transactional queue
//! to track pending receipt deadlines.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{after, select, Sender};
use parking_lot::Mutex;


/// How often the background thread wakes up to sweep for expired entries, absent any more
/// specific deadline to wait on.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A value stored in an [`ExpiringSet`], together with the deadline it expires at and the TTL
/// that produced that deadline (remembered so a later refresh can reuse it).
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub value: V,
    pub when:  Instant,
    pub ttl:   Duration,
}

struct Shared<K, V> {
    entries:    Mutex<HashMap<K, Entry<V>>>,
    on_expired: Box<dyn Fn(K, Entry<V>) + Send + Sync>,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Removes every entry whose deadline has passed as of this call and invokes `on_expired`
    /// for each, outside the entries lock.
    fn sweep(&self) {
        let expired: Vec<(K, Entry<V>)> = {
            let now     = Instant::now();
            let mut map = self.entries.lock();
            let expired_keys: Vec<K> = map
                .iter()
                .filter(|&(_, entry)| entry.when <= now)
                .map(|(key, _)| key.clone())
                .collect();

            expired_keys
                .into_iter()
                .filter_map(|key| map.remove(&key).map(|entry| (key, entry)))
                .collect()
        };

        for (key, entry) in expired {
            (self.on_expired)(key, entry);
        }
    }

    /// The earliest deadline currently stored, if any entries remain.
    fn next_deadline(&self) -> Option<Instant> {
        self.entries.lock().values().map(|entry| entry.when).min()
    }
}

/// A keyed map of values with per-key expiration deadlines, backed by a mutex-guarded table and
/// a background thread that wakes at (approximately) the next deadline.
///
/// The background thread provides best-effort, prompt eviction; it is not the correctness
/// mechanism. A caller with a correctness requirement (e.g. "an expired receipt must become
/// visible before the next operation returns") must additionally call [`sweep_now`] itself rather
/// than rely on the background thread's timing - mirroring the pull-based lazy sweep the
/// transactional queue performs at the start of every `dequeue`.
///
/// [`sweep_now`]: ExpiringSet::sweep_now
pub struct ExpiringSet<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    shared:  Arc<Shared<K, V>>,
    stop_tx: Sender<()>,
    thread:  Option<JoinHandle<()>>,
}

impl<K, V> Debug for ExpiringSet<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExpiringSet")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> ExpiringSet<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Creates an empty `ExpiringSet` and starts its background sweep thread.
    ///
    /// `on_expired` is called, on the background thread, for every entry whose deadline has
    /// passed at the moment it is removed; it is never called with an entry whose deadline is
    /// still in the future - a concurrent [`set_or_update`] that refreshes an entry's deadline
    /// before the sweep takes the entries lock simply keeps that entry alive.
    ///
    /// [`set_or_update`]: ExpiringSet::set_or_update
    pub fn new(on_expired: impl Fn(K, Entry<V>) + Send + Sync + 'static) -> Self {
        let shared = Arc::new(Shared {
            entries:    Mutex::new(HashMap::new()),
            on_expired: Box::new(on_expired),
        });

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
        let thread_shared       = Arc::clone(&shared);

        let thread = thread::spawn(move || loop {
            let wait = thread_shared.next_deadline().map_or(DEFAULT_POLL_INTERVAL, |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .max(Duration::from_millis(1))
            });

            select! {
                recv(stop_rx) -> _ => return,
                recv(after(wait)) -> _ => thread_shared.sweep(),
            }
        });

        Self {
            shared,
            stop_tx,
            thread: Some(thread),
        }
    }

    /// Sets (or refreshes) `key`'s deadline to `now + ttl` and stores `value`, remembering `ttl`
    /// so a later bare refresh can reuse it.
    pub fn set_or_update(&self, key: K, value: V, ttl: Duration) {
        self.set_or_update_at(key, value, Instant::now() + ttl, ttl);
    }

    /// Sets (or refreshes) `key`'s deadline to the explicit `deadline`, remembering `ttl` for
    /// future bare refreshes.
    pub fn set_or_update_at(&self, key: K, value: V, deadline: Instant, ttl: Duration) {
        self.shared.entries.lock().insert(key, Entry { value, when: deadline, ttl });
    }

    /// Returns a clone of the entry stored for `key`, if present.
    pub fn get(&self, key: &K) -> Option<Entry<V>>
    where
        V: Clone,
    {
        self.shared.entries.lock().get(key).cloned()
    }

    /// Returns `key`'s current deadline, if present, without cloning its value.
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.shared.entries.lock().get(key).map(|entry| entry.when)
    }

    /// Removes `key` immediately, without invoking `on_expired`. Returns the removed entry, if
    /// any was present.
    pub fn delete(&self, key: &K) -> Option<Entry<V>> {
        self.shared.entries.lock().remove(key)
    }

    /// Removes every currently-expired entry and invokes `on_expired` for each, synchronously on
    /// the calling thread.
    ///
    /// This is the pull-based counterpart to the background thread's sweep; callers that need a
    /// hard guarantee that expired entries have been processed before proceeding should call this
    /// rather than wait on the background thread.
    pub fn sweep_now(&self) {
        self.shared.sweep();
    }

    /// The number of entries currently stored, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Whether the set currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.entries.lock().is_empty()
    }

    /// The number of entries whose deadline has already passed, without removing them.
    #[must_use]
    pub fn expired_count(&self) -> usize {
        let now = Instant::now();
        self.shared.entries.lock().values().filter(|entry| entry.when <= now).count()
    }

    /// Removes every entry, without invoking `on_expired`.
    pub fn clear(&self) {
        self.shared.entries.lock().clear();
    }
}

impl<K, V> Drop for ExpiringSet<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn get_and_delete_round_trip() {
        let set: ExpiringSet<u64, &'static str> = ExpiringSet::new(|_, _| {});

        set.set_or_update(1, "one", Duration::from_secs(60));
        assert_eq!(set.get(&1).unwrap().value, "one");
        assert_eq!(set.len(), 1);

        let removed = set.delete(&1).unwrap();
        assert_eq!(removed.value, "one");
        assert!(set.get(&1).is_none());
    }

    #[test]
    fn sweep_now_evicts_and_calls_back() {
        let evicted: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let evicted_clone = Arc::clone(&evicted);

        let set: ExpiringSet<u64, &'static str> =
            ExpiringSet::new(move |key, _entry| evicted_clone.lock().unwrap().push(key));

        set.set_or_update_at(1, "stale", Instant::now() - Duration::from_secs(1), Duration::from_secs(1));
        set.set_or_update(2, "fresh", Duration::from_secs(60));

        set.sweep_now();

        assert_eq!(*evicted.lock().unwrap(), vec![1]);
        assert!(set.get(&1).is_none());
        assert!(set.get(&2).is_some());
    }

    #[test]
    fn refresh_before_sweep_keeps_entry_alive() {
        let set: ExpiringSet<u64, &'static str> = ExpiringSet::new(|_, _| {});

        set.set_or_update_at(1, "v", Instant::now() - Duration::from_secs(1), Duration::from_secs(1));
        set.set_or_update(1, "v", Duration::from_secs(60));

        set.sweep_now();
        assert!(set.get(&1).is_some());
    }
}
