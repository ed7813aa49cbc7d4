// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interception counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::decision::DecisionKind;

/// Live counters shared by an interceptor and its in-flight requests
#[derive(Debug, Default)]
pub struct InterceptMetrics {
    paused: AtomicU64,
    continued: AtomicU64,
    passed_through: AtomicU64,
    fulfilled: AtomicU64,
    failed: AtomicU64,
    conflicts: AtomicU64,
    transport_errors: AtomicU64,
    dispatch_errors: AtomicU64,
}

/// Point-in-time copy of [`InterceptMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptStats {
    /// Notifications turned into events
    pub paused: u64,
    /// Continue commands sent (with or without overrides)
    pub continued: u64,
    /// Of `continued`, those issued because the chain ran out
    pub passed_through: u64,
    /// Fulfill commands sent
    pub fulfilled: u64,
    /// Fail commands sent (abort and fail)
    pub failed: u64,
    /// Rejected double decisions
    pub conflicts: u64,
    /// Commands the facade rejected
    pub transport_errors: u64,
    /// Dispatches that ended in an error
    pub dispatch_errors: u64,
}

impl InterceptMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_paused(&self) {
        self.paused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decision(&self, kind: DecisionKind) {
        let counter = match kind {
            DecisionKind::Abort | DecisionKind::Fail => &self.failed,
            DecisionKind::Continue => &self.continued,
            DecisionKind::Fulfill => &self.fulfilled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass_through(&self) {
        self.passed_through.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch_error(&self) {
        self.dispatch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot
    pub fn snapshot(&self) -> InterceptStats {
        InterceptStats {
            paused: self.paused.load(Ordering::Relaxed),
            continued: self.continued.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            fulfilled: self.fulfilled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            dispatch_errors: self.dispatch_errors.load(Ordering::Relaxed),
        }
    }
}

impl InterceptStats {
    /// Commands successfully sent
    pub fn resolved(&self) -> u64 {
        self.continued + self.fulfilled + self.failed
    }
}
