// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for profiling and leak diagnostics.
//!
//! [`AllocationStats`] tracks cumulative metrics about how a
//! [`TensorPool`](crate::TensorPool) is being used. Tests lean on these
//! counters to prove that failing kernel calls leave no tensor behind.

/// Cumulative statistics about tensor pool usage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocationStats {
    /// Total number of tensor allocations served.
    pub total_allocations: u64,
    /// Number of allocation requests that failed due to budget exhaustion.
    pub oom_count: u64,
    /// Peak live memory in bytes.
    pub peak_live_bytes: usize,
    /// Total bytes ever allocated (including released tensors).
    pub cumulative_allocated_bytes: u64,
    /// Total number of tensor releases (drops).
    pub total_releases: u64,
}

impl AllocationStats {
    /// Records a successful allocation.
    pub(crate) fn record_allocation(&mut self, size: usize) {
        self.total_allocations += 1;
        self.cumulative_allocated_bytes += size as u64;
    }

    /// Records an OOM event.
    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    /// Records a release (tensor dropped, bytes returned).
    pub(crate) fn record_release(&mut self) {
        self.total_releases += 1;
    }

    /// Updates the peak live-bytes high-water mark if needed.
    pub(crate) fn update_peak(&mut self, current_bytes: usize) {
        if current_bytes > self.peak_live_bytes {
            self.peak_live_bytes = current_bytes;
        }
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_live_bytes as f64 / 1024.0;
        format!(
            "Allocations: {} total, {} releases, {} OOMs, peak {:.2} KB live",
            self.total_allocations, self.total_releases, self.oom_count, peak_kb,
        )
    }
}
