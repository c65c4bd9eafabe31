//! Collapses concurrent computations for the same key into one
//!
//! Callers that arrive while a computation for their key is running share its
//! result instead of starting their own. Once the computation finishes the key is
//! forgotten, so later callers start a fresh flight; nothing is cached across flights.

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::OnceCell;

type Slot<V, E> = Arc<OnceCell<Result<V, E>>>;

/// A running computation and the number of callers attached to it
struct Pending<V, E> {
    slot: Slot<V, E>,
    callers: usize,
}

/// Outcome of [`SingleFlight::run_once`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight<V, E> {
    pub result: Result<V, E>,
    /// True when this caller received a result computed by another caller
    pub shared: bool,
}

/// Per-key deduplication of in-flight work
pub struct SingleFlight<K, V, E> {
    in_flight: Mutex<HashMap<K, Pending<V, E>>>,
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self { in_flight: Mutex::new(HashMap::new()) }
    }

    /// Run `compute` unless a computation for `key` is already running, in which case
    /// wait for it and return a clone of its result (value or error).
    ///
    /// If the caller driving the computation is dropped, one of the remaining waiters
    /// takes over with its own `compute`. When the last caller for a key is dropped the
    /// key is released.
    pub async fn run_once<F, Fut>(&self, key: K, compute: F) -> Flight<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.join(&key);
        let _attached = Attached { flights: self, key: &key, slot: &slot };

        let mut computed_here = false;
        let result = slot
            .get_or_init(|| {
                computed_here = true;
                let (key, slot) = (&key, &slot);
                async move {
                    let result = compute().await;
                    // Released before the result is published, so a caller joining from
                    // now on starts a new flight instead of reading this one.
                    self.forget(key, slot);
                    result
                }
            })
            .await
            .clone();

        Flight { result, shared: !computed_here }
    }

    /// Number of keys with a computation currently running
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn join(&self, key: &K) -> Slot<V, E> {
        let mut in_flight = self.lock();
        let pending = in_flight
            .entry(key.clone())
            .or_insert_with(|| Pending { slot: Arc::new(OnceCell::new()), callers: 0 });
        pending.callers += 1;
        Arc::clone(&pending.slot)
    }

    fn forget(&self, key: &K, slot: &Slot<V, E>) {
        let mut in_flight = self.lock();
        if in_flight.get(key).is_some_and(|pending| Arc::ptr_eq(&pending.slot, slot)) {
            in_flight.remove(key);
        }
    }

    /// Detach one caller; the key is dropped once nobody is left to finish the work
    fn leave(&self, key: &K, slot: &Slot<V, E>) {
        let mut in_flight = self.lock();
        let Some(pending) = in_flight.get_mut(key) else {
            return;
        };
        if !Arc::ptr_eq(&pending.slot, slot) {
            return;
        }

        pending.callers = pending.callers.saturating_sub(1);
        if pending.callers == 0 {
            in_flight.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Pending<V, E>>> {
        // The map is only touched by non-panicking code, poisoning carries no meaning
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Caller registration for one key, released on completion or cancellation
struct Attached<'a, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    flights: &'a SingleFlight<K, V, E>,
    key: &'a K,
    slot: &'a Slot<V, E>,
}

impl<K, V, E> Drop for Attached<'_, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        self.flights.leave(self.key, self.slot);
    }
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use tokio::sync::Barrier;

    use super::*;

    #[tokio::test]
    async fn test_single_caller_computes() {
        let flights: SingleFlight<String, u32, String> = SingleFlight::new();

        let flight = flights.run_once("a".to_string(), || async { Ok(7) }).await;

        assert_eq!(flight.result, Ok(7));
        assert!(!flight.shared);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let flights: Arc<SingleFlight<String, u32, String>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(20));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let flights = Arc::clone(&flights);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                flights
                    .run_once("key".to_string(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        let mut shared = 0;
        for handle in handles {
            let flight = handle.await.unwrap();
            assert_eq!(flight.result, Ok(42));
            if flight.shared {
                shared += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(shared, 19);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_forgotten() {
        let flights: Arc<SingleFlight<&'static str, u32, String>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flights = Arc::clone(&flights);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flights
                    .run_once("key", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<u32, _>("index offline".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().result, Err("index offline".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A retry after the failure starts a new flight
        let retry = flights.run_once("key", || async { Ok(1) }).await;
        assert_eq!(retry.result, Ok(1));
        assert!(!retry.shared);
    }

    #[tokio::test]
    async fn test_sequential_calls_recompute() {
        let flights: SingleFlight<u8, usize, ()> = SingleFlight::new();
        let calls = AtomicUsize::new(0);

        for expected in 1..=3 {
            let flight = flights
                .run_once(1, || async { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) })
                .await;
            assert_eq!(flight.result, Ok(expected));
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let flights: Arc<SingleFlight<u8, u8, ()>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for key in 0..4u8 {
            let flights = Arc::clone(&flights);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flights
                    .run_once(key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(key)
                    })
                    .await
            }));
        }

        for (key, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().result, Ok(key as u8));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_dropped_leader_hands_over() {
        let flights: Arc<SingleFlight<&'static str, u32, ()>> = Arc::new(SingleFlight::new());

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                flights
                    .run_once("key", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(flights.in_flight(), 1);

        leader.abort();
        let _ = leader.await;

        let follower = flights.run_once("key", || async { Ok(2) }).await;
        assert_eq!(follower.result, Ok(2));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_sole_caller_releases_key() {
        let flights: SingleFlight<u32, u32, ()> = SingleFlight::new();

        for key in 0..10 {
            let lookup = flights.run_once(key, || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1)
            });
            assert!(tokio::time::timeout(Duration::from_millis(5), lookup).await.is_err());
        }

        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_keeps_flight_for_others() {
        let flights: Arc<SingleFlight<&'static str, u32, ()>> = Arc::new(SingleFlight::new());
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                flights
                    .run_once("key", || async move {
                        let _ = released.await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = flights.run_once("key", || async { Ok(2) });
        assert!(tokio::time::timeout(Duration::from_millis(5), waiter).await.is_err());
        assert_eq!(flights.in_flight(), 1);

        release.send(()).unwrap();
        assert_eq!(leader.await.unwrap().result, Ok(1));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_finished_flight_is_not_joined_by_later_caller() {
        let flights: Arc<SingleFlight<&'static str, u32, String>> = Arc::new(SingleFlight::new());
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                let failed = flights
                    .run_once("key", || async move {
                        let _ = released.await;
                        Err("index offline".to_string())
                    })
                    .await;
                // Waiters of the failed flight have not run yet, the key must already be free
                let retried = flights.run_once("key", || async { Ok(3) }).await;
                (failed, retried)
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move { flights.run_once("key", || async { Ok(2) }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(flights.in_flight(), 1);

        release.send(()).unwrap();
        let (failed, retried) = leader.await.unwrap();
        assert_eq!(failed.result, Err("index offline".to_string()));
        assert_eq!(retried.result, Ok(3));
        assert!(!retried.shared);

        let waited = waiter.await.unwrap();
        assert_eq!(waited.result, Err("index offline".to_string()));
        assert!(waited.shared);
        assert_eq!(flights.in_flight(), 0);
    }
}
