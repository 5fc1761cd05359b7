//! Per-batch validation counters.

use serde::Serialize;

/// Counts accepted and rejected records for one batch of one entity type.
///
/// A tracker is created per batch and handed back to the caller; nothing is
/// shared between batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationTracker {
    valid: u64,
    invalid: u64,
    total: u64,
}

/// Snapshot of a tracker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub valid: u64,
    pub invalid: u64,
    pub total: u64,
    /// `valid / total`, 0 when nothing was processed.
    pub success_rate: f64,
}

impl ValidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_valid(&mut self) {
        self.valid += 1;
        self.total += 1;
    }

    pub fn record_invalid(&mut self) {
        self.invalid += 1;
        self.total += 1;
    }

    pub fn summary(&self) -> ValidationSummary {
        let success_rate = if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        };
        ValidationSummary {
            valid: self.valid,
            invalid: self.invalid,
            total: self.total,
            success_rate,
        }
    }
}
