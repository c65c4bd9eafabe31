//! A clock that only moves when told to

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use accessd_cache::Clock;

/// Clock for TTL tests; starts at the real "now" and advances only via [`ManualClock::advance`]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
