use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};

/// Coalesces concurrent requests for the same key onto one in-flight future.
///
/// The first caller for a key starts the work; everyone arriving before it
/// resolves awaits the same future and receives a clone of its output. Once
/// resolved the slot is cleared, so the next call starts fresh work.
pub struct SingleFlight<K, T>
where
    T: Clone,
{
    inflight: Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the in-flight call for `key`, or starts one with `start`.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let fut = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match inflight.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let fut = start().boxed().shared();
                    inflight.insert(key.clone(), fut.clone());
                    fut
                }
            }
        };

        let out = fut.clone().await;

        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if inflight.get(&key).is_some_and(|current| current.ptr_eq(&fut)) {
            inflight.remove(&key);
        }
        out
    }

    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forgets pending work. Callers already awaiting it still get its result.
    pub fn clear(&self) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
