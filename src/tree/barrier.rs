//! Fan-out completion barrier
//!
//! Tracks an outstanding count of work units whose total is discovered at
//! runtime. A unit that expands into children registers every child before it
//! arrives itself, so the count can only reach zero once every discovered unit
//! has finished.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::error;

/// Counters describing the lifetime of a barrier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierStats {
    pub registered: usize,
    pub arrived: usize,
}

/// Barrier over a dynamically growing set of work units
#[derive(Debug, Default)]
pub struct FanOutBarrier {
    outstanding: Mutex<usize>,
    zero: Condvar,
    registered: AtomicUsize,
    arrived: AtomicUsize,
}

impl FanOutBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one unit of work. Must be called before the unit is scheduled.
    pub fn register(&self) {
        self.register_many(1);
    }

    /// Account for `count` units of work at once
    pub fn register_many(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut outstanding = self.outstanding.lock();
        *outstanding += count;
        self.registered.fetch_add(count, Ordering::Relaxed);
    }

    /// Retire one unit of work, waking waiters when nothing remains outstanding
    pub fn arrive(&self) {
        let mut outstanding = self.outstanding.lock();
        if *outstanding == 0 {
            error!("arrive() called on a barrier with no outstanding units");
            return;
        }
        *outstanding -= 1;
        self.arrived.fetch_add(1, Ordering::Relaxed);
        if *outstanding == 0 {
            self.zero.notify_all();
        }
    }

    /// Block until the outstanding count reaches zero
    pub fn await_zero(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding != 0 {
            self.zero.wait(&mut outstanding);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses.
    ///
    /// Returns true when the barrier cleared.
    pub fn await_zero_timeout(&self, timeout: Duration) -> bool {
        let mut outstanding = self.outstanding.lock();
        while *outstanding != 0 {
            if self.zero.wait_for(&mut outstanding, timeout).timed_out() {
                return *outstanding == 0;
            }
        }
        true
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    pub fn stats(&self) -> BarrierStats {
        BarrierStats {
            registered: self.registered.load(Ordering::Relaxed),
            arrived: self.arrived.load(Ordering::Relaxed),
        }
    }
}
