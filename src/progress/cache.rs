//! Time-boxed single-slot read cache

use std::time::{Duration, Instant};

/// Holds one value together with the instant it was last refreshed.
///
/// The value is served while younger than `ttl`; afterwards the owner has to
/// go back to the backing store and `put` the fresh value.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Option<(T, Instant)>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self) -> Option<T> {
        self.get_at(Instant::now())
    }

    pub fn get_at(&self, now: Instant) -> Option<T> {
        match &self.slot {
            Some((value, refreshed)) if now.saturating_duration_since(*refreshed) < self.ttl => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn put(&mut self, value: T) {
        self.put_at(value, Instant::now());
    }

    pub fn put_at(&mut self, value: T, now: Instant) {
        self.slot = Some((value, now));
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}
