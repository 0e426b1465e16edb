//! # Redelivered Event Cache
//!
//! Remembers recently processed `webhookEventId`s so a redelivered event is
//! not run through the conversation twice.
//!
//! - Ids are remembered for [`EventIdCache::DEFAULT_TTL`]
//! - At most [`EventIdCache::DEFAULT_CAPACITY`] ids are held; expired ids are
//!   evicted first, then the oldest one

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Time-bounded set of seen event ids.
#[derive(Debug)]
pub struct EventIdCache {
    /// Map of event id -> expiry instant
    seen: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
    capacity: usize,
}

impl EventIdCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_TTL, Self::DEFAULT_CAPACITY)
    }

    pub fn with_config(ttl: Duration, capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Record `id`.
    ///
    /// # Returns
    ///
    /// - `true` if the id is fresh
    /// - `false` if it was seen within the TTL (duplicate)
    pub fn check_and_insert(&self, id: &str) -> bool {
        self.check_and_insert_at(id, Instant::now())
    }

    pub(crate) fn check_and_insert_at(&self, id: &str, now: Instant) -> bool {
        let mut seen = self.seen.lock();

        if let Some(&expiry) = seen.get(id) {
            if expiry > now {
                return false;
            }
        }

        if seen.len() >= self.capacity && !seen.contains_key(id) {
            seen.retain(|_, expiry| *expiry > now);
            if seen.len() >= self.capacity {
                let oldest = seen
                    .iter()
                    .min_by_key(|(_, expiry)| **expiry)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    seen.remove(&oldest);
                }
            }
        }

        seen.insert(id.to_string(), now + self.ttl);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventIdCache {
    fn default() -> Self {
        Self::new()
    }
}
