//! Diagnostic counters for throttling decisions
//!
//! Counters are never consulted by decision logic; they exist so operators
//! can see what the shedding systems are doing. Windowed counters reset on a
//! fixed reporting interval, cumulative counters never do.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics registry shared across all shedding systems
#[derive(Debug, Default)]
pub struct ShedMetrics {
    // Per-window counters (reset on each report)
    pub npc_throttled: AtomicU64,
    pub npc_forced: AtomicU64,
    pub projectile_throttled: AtomicU64,
    pub projectile_forced: AtomicU64,
    pub updates_skipped: AtomicU64,

    // Cumulative counters
    pub entities_trimmed: AtomicU64,
    pub residency_inserts: AtomicU64,
    pub residency_evictions: AtomicU64,
    pub jobs_run: AtomicU64,
    pub jobs_dropped: AtomicU64,
    pub particles_dropped: AtomicU64,

    window_start_tick: AtomicU64,
}

impl ShedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_npc_throttled(&self) {
        self.npc_throttled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_npc_forced(&self) {
        self.npc_forced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_projectile_throttled(&self) {
        self.projectile_throttled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_projectile_forced(&self) {
        self.projectile_forced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_update_skipped(&self) {
        self.updates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_trimmed(&self, count: usize) {
        self.entities_trimmed.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Emit a summary and reset the windowed counters once per report window
    pub fn window_report(&self, tick: u64, interval: u64) {
        let start = self.window_start_tick.load(Ordering::Relaxed);
        if tick.saturating_sub(start) < interval {
            return;
        }
        // Single reporter per tick thread; a racing second report is harmless
        self.window_start_tick.store(tick, Ordering::Relaxed);

        let npc_throttled = self.npc_throttled.swap(0, Ordering::Relaxed);
        let npc_forced = self.npc_forced.swap(0, Ordering::Relaxed);
        let proj_throttled = self.projectile_throttled.swap(0, Ordering::Relaxed);
        let proj_forced = self.projectile_forced.swap(0, Ordering::Relaxed);
        let skipped = self.updates_skipped.swap(0, Ordering::Relaxed);

        tracing::debug!(
            npc_throttled,
            npc_forced,
            proj_throttled,
            proj_forced,
            updates_skipped = skipped,
            trimmed_total = self.entities_trimmed.load(Ordering::Relaxed),
            jobs_run = self.jobs_run.load(Ordering::Relaxed),
            jobs_dropped = self.jobs_dropped.load(Ordering::Relaxed),
            "shed window summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ShedMetrics::new();
        metrics.record_npc_throttled();
        metrics.record_npc_throttled();
        metrics.record_npc_forced();
        metrics.record_trimmed(7);

        assert_eq!(metrics.npc_throttled.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.npc_forced.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.entities_trimmed.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_window_report_resets_windowed_counters() {
        let metrics = ShedMetrics::new();
        metrics.record_npc_throttled();
        metrics.record_projectile_forced();

        // Before the window elapses nothing resets
        metrics.window_report(100, 300);
        assert_eq!(metrics.npc_throttled.load(Ordering::Relaxed), 1);

        // After the window the per-window counters reset, cumulative survive
        metrics.record_trimmed(3);
        metrics.window_report(300, 300);
        assert_eq!(metrics.npc_throttled.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.projectile_forced.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.entities_trimmed.load(Ordering::Relaxed), 3);
    }
}
