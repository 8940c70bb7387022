use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use nd_core::{Error, Result};

type Work<T> = BoxFuture<'static, std::result::Result<T, Arc<Error>>>;
type Pending<T> = Shared<Work<T>>;

/// Merges concurrent computations for the same key into one in-flight future.
///
/// The first caller for a key starts the work; callers arriving while it is
/// pending await the same result. The entry is removed once it settles, so a
/// later call (after success, failure or a panic) starts fresh. If every caller
/// gives up before it settles, the work is dropped along with the entry.
pub struct Coalescer<K, T> {
    pending: Mutex<HashMap<K, WeakShared<Work<T>>>>,
}

impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> Coalescer<K, T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<K, WeakShared<Work<T>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of keys with a computation currently pending.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let pending = {
            let mut map = self.lock();
            match map.get(&key).and_then(WeakShared::upgrade) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight computation for {:?}", key);
                    existing
                }
                None => {
                    let shared = start(work());
                    if let Some(weak) = shared.downgrade() {
                        map.insert(key.clone(), weak);
                    }
                    shared
                }
            }
        };

        let waiter = Waiter {
            coalescer: self,
            key,
            pending: Some(pending.clone()),
        };
        // Declared after `waiter`, so it is released first even when this call is cancelled.
        let mut polled = pending;
        let outcome = (&mut polled).await;
        drop(polled);
        drop(waiter);

        outcome.map_err(Error::from_shared)
    }
}

fn start<T, Fut>(work: Fut) -> Pending<T>
where
    T: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    AssertUnwindSafe(work)
        .catch_unwind()
        .map(|outcome| match outcome {
            Ok(result) => result.map_err(Arc::new),
            Err(_) => {
                tracing::error!("Coalesced computation panicked");
                Err(Arc::new(Error::Inference("Computation panicked".to_string())))
            }
        })
        .boxed()
        .shared()
}

/// Clears the map entry when a caller stops waiting, however that happens.
struct Waiter<'a, K: Eq + Hash, T: Clone> {
    coalescer: &'a Coalescer<K, T>,
    key: K,
    pending: Option<Pending<T>>,
}

impl<K: Eq + Hash, T: Clone> Drop for Waiter<'_, K, T> {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let settled = pending.peek().is_some();
        let mut map = self.coalescer.lock();

        match map.get(&self.key).map(WeakShared::upgrade) {
            None => {}
            Some(None) => {
                map.remove(&self.key);
            }
            Some(Some(current)) => {
                // A newer computation already took this key.
                if !current.ptr_eq(&pending) {
                    return;
                }
                drop(current);
                drop(pending);
                let abandoned = map.get(&self.key).and_then(WeakShared::upgrade).is_none();
                if settled || abandoned {
                    map.remove(&self.key);
                }
            }
        }
    }
}
