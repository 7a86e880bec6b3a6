/*!
Bookkeeping shared by all the contexts of an application.

Nothing here is global: the application creates a `Registry`, passes it to the contexts it
builds and keeps it for as long as it needs it. Enumerations return snapshots, so they can't
be invalidated by contexts being created or destroyed concurrently.

*/
use fnv::{FnvHashMap, FnvHashSet};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::context::{Attempt, Context, VersionRequest};

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remembers which creation attempt succeeded for each device and request, so that the
/// version ladder is only walked once.
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: Mutex<FnvHashMap<(String, VersionRequest), Attempt>>,
}

impl VersionCache {
    /// Builds an empty cache.
    #[inline]
    pub fn new() -> VersionCache {
        Default::default()
    }

    /// Returns the attempt that succeeded the last time.
    #[inline]
    pub fn get(&self, device: &str, request: &VersionRequest) -> Option<Attempt> {
        lock(&self.entries).get(&(device.to_owned(), *request)).cloned()
    }

    /// Records a successful attempt.
    #[inline]
    pub fn insert(&self, device: &str, request: &VersionRequest, attempt: Attempt) {
        lock(&self.entries).insert((device.to_owned(), *request), attempt);
    }

    /// Forgets an entry that the driver no longer accepts.
    #[inline]
    pub fn remove(&self, device: &str, request: &VersionRequest) {
        lock(&self.entries).remove(&(device.to_owned(), *request));
    }

    /// Forgets everything.
    #[inline]
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Number of cached entries.
    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true if nothing is cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

#[derive(Default)]
struct Contexts {
    live: FnvHashMap<usize, Weak<Context>>,
    // symmetric: if `a` shares with `b`, `b` shares with `a`
    shares: FnvHashMap<usize, FnvHashSet<usize>>,
}

/// Registry of the live contexts of an application and of their share relations.
#[derive(Default)]
pub struct Registry {
    contexts: Mutex<Contexts>,
    versions: VersionCache,
}

impl Registry {
    /// Builds an empty registry.
    #[inline]
    pub fn new() -> Arc<Registry> {
        Arc::new(Default::default())
    }

    /// Returns the negotiation cache.
    #[inline]
    pub fn versions(&self) -> &VersionCache {
        &self.versions
    }

    /// Number of registered contexts.
    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.contexts).live.len()
    }

    /// Returns true if no context is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        lock(&self.contexts).live.is_empty()
    }

    /// Adds a context. Called when its native context is created.
    pub fn register(&self, context: &Arc<Context>) {
        lock(&self.contexts).live.insert(context.id(), Arc::downgrade(context));
    }

    /// Removes a context and its share relations. Called when it is destroyed or dropped.
    pub fn unregister(&self, context_id: usize) {
        let mut contexts = lock(&self.contexts);
        contexts.live.remove(&context_id);

        if let Some(peers) = contexts.shares.remove(&context_id) {
            for peer in peers {
                if let Some(set) = contexts.shares.get_mut(&peer) {
                    set.remove(&context_id);
                }
            }
        }
    }

    /// Records that two contexts share their objects.
    pub fn add_share(&self, a: &Context, b: &Context) {
        if a.id() == b.id() {
            return;
        }

        let mut contexts = lock(&self.contexts);
        contexts.shares.entry(a.id()).or_insert_with(Default::default).insert(b.id());
        contexts.shares.entry(b.id()).or_insert_with(Default::default).insert(a.id());
    }

    /// Returns the live contexts, ordered by creation.
    pub fn snapshot(&self) -> Vec<Arc<Context>> {
        let contexts = lock(&self.contexts);
        let mut result: Vec<_> = contexts.live.values().filter_map(|w| w.upgrade()).collect();
        result.sort_by_key(|c| c.id());
        result
    }

    /// Returns every live context that shares objects with `context`, directly or through
    /// other contexts, ordered by creation. `context` itself is not included.
    pub fn share_group(&self, context: &Context) -> Vec<Arc<Context>> {
        let contexts = lock(&self.contexts);

        let mut visited = FnvHashSet::default();
        let mut pending = vec![context.id()];
        visited.insert(context.id());

        while let Some(id) = pending.pop() {
            if let Some(peers) = contexts.shares.get(&id) {
                for &peer in peers {
                    if visited.insert(peer) {
                        pending.push(peer);
                    }
                }
            }
        }

        let mut result: Vec<_> = visited.into_iter()
            .filter(|&id| id != context.id())
            .filter_map(|id| contexts.live.get(&id).and_then(|w| w.upgrade()))
            .collect();
        result.sort_by_key(|c| c.id());
        result
    }
}
