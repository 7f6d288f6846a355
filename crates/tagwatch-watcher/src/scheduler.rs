//! Poll scheduler.
//!
//! Drives [`PollCycle::run`] on a fixed interval. Cycles never overlap: the
//! next tick is only awaited after the current cycle finished, and ticks
//! missed meanwhile are skipped rather than replayed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::cycle::PollCycle;

/// Configuration for the poll scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between cycle starts.
    pub interval: Duration,

    /// How late a tick may start before it is reported.
    pub late_tolerance: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            late_tolerance: Duration::from_secs(5),
        }
    }
}

impl SchedulerConfig {
    /// Creates a configuration builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

/// Builder for `SchedulerConfig`.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    interval: Option<Duration>,
    late_tolerance: Option<Duration>,
}

impl SchedulerConfigBuilder {
    /// Sets the poll interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the late tolerance.
    pub fn late_tolerance(mut self, tolerance: Duration) -> Self {
        self.late_tolerance = Some(tolerance);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SchedulerConfig {
        let defaults = SchedulerConfig::default();
        SchedulerConfig {
            interval: self.interval.unwrap_or(defaults.interval),
            late_tolerance: self.late_tolerance.unwrap_or(defaults.late_tolerance),
        }
    }
}

/// Counters kept by a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles that completed with a report.
    pub completed: u64,

    /// Cycles that returned an error.
    pub errored: u64,

    /// Ticks that started later than the tolerance.
    pub late_ticks: u64,
}

/// Runs poll cycles on a fixed cadence until shut down.
pub struct PollScheduler {
    cycle: Arc<PollCycle>,
    config: SchedulerConfig,
}

impl PollScheduler {
    /// Creates a scheduler.
    pub fn new(cycle: Arc<PollCycle>, config: SchedulerConfig) -> Self {
        Self { cycle, config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs cycles until `shutdown` completes.
    ///
    /// The first cycle starts immediately. A shutdown requested while a
    /// cycle is running takes effect once that cycle finishes.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut stats = SchedulerStats::default();

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "poll scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping poll scheduler");
                    break;
                }
                scheduled = ticker.tick() => {
                    if let Some(lateness) = lateness(scheduled, Instant::now(), self.config.late_tolerance) {
                        stats.late_ticks += 1;
                        tracing::warn!(
                            late_ms = %lateness.as_millis(),
                            "poll tick running late"
                        );
                    }

                    match self.cycle.run().await {
                        Ok(_) => stats.completed += 1,
                        Err(e) => {
                            stats.errored += 1;
                            tracing::error!(kind = %e.kind(), error = %e, "poll cycle failed");
                        }
                    }
                }
            }
        }

        tracing::info!(
            completed = stats.completed,
            errored = stats.errored,
            late_ticks = stats.late_ticks,
            "poll scheduler stopped"
        );
        stats
    }
}

/// Returns how late a tick started, if beyond `tolerance`.
fn lateness(scheduled: Instant, started: Instant, tolerance: Duration) -> Option<Duration> {
    let late = started.saturating_duration_since(scheduled);
    (late > tolerance).then_some(late)
}
