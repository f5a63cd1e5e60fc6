//! In-flight request coalescing.
//!
//! A [`SingleFlight`] maps a key to the shared future currently computing its
//! value. Callers that arrive while a computation is running await the same
//! future and receive a clone of its output; the entry is cleared once the
//! future completes, so the next caller starts a fresh computation.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

/// Whether a caller started the computation or joined one already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    Leader,
    Joined,
}

pub struct SingleFlight<K, T> {
    in_flight: Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self { in_flight: Mutex::new(HashMap::new()) }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` under `key`, or join the computation already running under it.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> (T, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (flight, role) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight.retain(|_, flight| flight.peek().is_none());

            match in_flight.get(&key) {
                Some(existing) => (existing.clone(), FlightRole::Joined),
                None => {
                    let flight = make().boxed().shared();
                    in_flight.insert(key.clone(), flight.clone());
                    (flight, FlightRole::Leader)
                }
            }
        };

        let value = flight.await;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(&key).is_some_and(|flight| flight.peek().is_some()) {
            in_flight.remove(&key);
        }

        (value, role)
    }

    /// Number of keys with a computation still running.
    pub fn in_flight(&self) -> usize {
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.values().filter(|flight| flight.peek().is_none()).count()
    }
}
