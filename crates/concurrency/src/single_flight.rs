//! Single-flight execution keyed by id
//!
//! N concurrent callers asking for the same key while a computation is in
//! flight all receive the result of that one computation.
//!
//! ## Protocol
//!
//! ```text
//! 1. lock the in-flight map, fetch or insert the slot for `key`, unlock
//! 2. slot.get_or_init(f)   - first caller runs `f`, the rest block on the slot
//! 3. clone the value out
//! 4. remove the slot if it is still the one we used
//! ```
//!
//! The slot is removed once the value is published, so the next call after
//! completion starts a fresh computation. Callers that must not repeat work
//! (e.g. a cache load) re-check their own state inside `f`.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Per-key deduplication of concurrent computations
#[derive(Debug)]
pub struct SingleFlight<K, V> {
    in_flight: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty flight table
    pub fn new() -> Self {
        SingleFlight {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` for `key` unless a run is already in flight; either way return its value
    pub fn run<F>(&self, key: &K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        let slot = {
            let mut in_flight = self.in_flight.lock();
            Arc::clone(
                in_flight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let value = slot.get_or_init(f).clone();

        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &slot))
        {
            in_flight.remove(key);
        }

        value
    }

    /// Number of keys with a computation in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}
