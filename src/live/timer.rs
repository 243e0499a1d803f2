#[cfg(test)]
use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::Utc;

use crate::models::DEFAULT_REST_SECS;

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(ms)),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestState {
    Idle,
    Resting,
}

/// Countdown between sets. Remaining time is always derived from the start
/// timestamp, so missed ticks never drift it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestTimer {
    resting: bool,
    duration: u64,
    started_at: Option<i64>,
}

impl Default for RestTimer {
    fn default() -> Self {
        Self {
            resting: false,
            duration: DEFAULT_REST_SECS,
            started_at: None,
        }
    }
}

impl RestTimer {
    /// Rebuilds a timer from persisted fields. A rest that ran out while
    /// nobody was watching comes back idle.
    pub fn restore(resting: bool, duration: u64, started_at: Option<i64>, now: i64) -> Self {
        let mut timer = Self {
            resting: resting && started_at.is_some(),
            duration,
            started_at: if resting { started_at } else { None },
        };
        timer.tick(now);
        timer
    }

    pub fn begin(&mut self, duration_secs: u64, now: i64) {
        self.resting = true;
        self.duration = duration_secs;
        self.started_at = Some(now);
    }

    /// Seconds left, `0` when idle.
    pub fn remaining(&self, now: i64) -> u64 {
        match (self.resting, self.started_at) {
            (true, Some(start)) => {
                let elapsed = (now - start).max(0) / 1000;
                self.duration.saturating_sub(elapsed as u64)
            }
            _ => 0,
        }
    }

    /// Recomputes against `now`. Returns `true` when the rest just ended.
    pub fn tick(&mut self, now: i64) -> bool {
        if self.resting && self.remaining(now) == 0 {
            self.stop();
            return true;
        }
        false
    }

    /// Ends the rest early. Returns `true` if a rest was running.
    pub fn skip(&mut self) -> bool {
        let was_resting = self.resting;
        self.stop();
        was_resting
    }

    fn stop(&mut self) {
        self.resting = false;
        self.started_at = None;
    }

    pub fn state(&self) -> RestState {
        if self.resting {
            RestState::Resting
        } else {
            RestState::Idle
        }
    }

    pub fn is_resting(&self) -> bool {
        self.resting
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn started_at(&self) -> Option<i64> {
        self.started_at
    }
}
