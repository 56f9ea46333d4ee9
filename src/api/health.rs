//! Shared health state for the /health endpoint.
//! Updated by the insights refresher and the manual fetch route.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last completed fetch cycle (0 = none).
    pub last_fetch_at_ns: AtomicU64,
    /// Columns successfully fetched and applied since startup.
    pub fetch_ok_total: AtomicU64,
    /// Columns that failed to fetch or apply since startup.
    pub fetch_error_total: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_fetch_at_ns(&self, ns: u64) {
        self.last_fetch_at_ns.store(ns, Ordering::Relaxed);
    }

    pub fn inc_fetch_ok(&self) {
        self.fetch_ok_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_error(&self) {
        self.fetch_error_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_fetch_at_ns(&self) -> u64 {
        self.last_fetch_at_ns.load(Ordering::Relaxed)
    }

    pub fn fetch_ok_total(&self) -> u64 {
        self.fetch_ok_total.load(Ordering::Relaxed)
    }

    pub fn fetch_error_total(&self) -> u64 {
        self.fetch_error_total.load(Ordering::Relaxed)
    }
}
