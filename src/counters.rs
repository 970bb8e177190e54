//! Run-wide statistics
//!
//! Workers never touch the shared counters. Each window reduces its results
//! into a [`WindowTally`] and the scheduler merges that tally into
//! [`RunCounters`] at the window barrier.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classifier::{ClassificationResult, Verdict};

/// Counts accumulated over one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowTally {
    pub processed: usize,
    pub oracle_queries: usize,
    pub service_matches: usize,
    pub hijackable: usize,
    pub failures: usize,
}

impl WindowTally {
    pub fn record(&mut self, result: &ClassificationResult) {
        self.processed += 1;
        if result.oracle_queried {
            self.oracle_queries += 1;
        }
        if matches!(result.verdict, Verdict::ServiceMatch { .. }) {
            self.service_matches += 1;
        }
        if result.is_hijackable() {
            self.hijackable += 1;
        }
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}

/// Process-wide aggregate statistics
#[derive(Debug, Default)]
pub struct RunCounters {
    processed: AtomicUsize,
    oracle_queries: AtomicUsize,
    service_matches: AtomicUsize,
    hijackable: AtomicUsize,
    failures: AtomicUsize,
    batches: AtomicUsize,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished window into the totals
    pub fn merge(&self, tally: &WindowTally) {
        self.processed.fetch_add(tally.processed, Ordering::Relaxed);
        self.oracle_queries.fetch_add(tally.oracle_queries, Ordering::Relaxed);
        self.service_matches.fetch_add(tally.service_matches, Ordering::Relaxed);
        self.hijackable.fetch_add(tally.hijackable, Ordering::Relaxed);
        self.failures.fetch_add(tally.failures, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            oracle_queries: self.oracle_queries.load(Ordering::Relaxed),
            service_matches: self.service_matches.load(Ordering::Relaxed),
            hijackable: self.hijackable.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub processed: usize,
    pub oracle_queries: usize,
    pub service_matches: usize,
    pub hijackable: usize,
    pub failures: usize,
    pub batches: usize,
}
