//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Call dispatch (units executed, by operation and result)
//! - Milestone lifecycle (condition transitions, spawned workers)
//! - Watchdog (forced terminations)

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts};

// =============================================================================
// Call Dispatch Metrics
// =============================================================================

/// Call units executed by the dispatch runner.
pub static CALLS_DISPATCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("milo_calls_dispatched_total", "Call units executed"),
        &["op", "result"], // result: "ok", "panicked"
    )
    .unwrap()
});

// =============================================================================
// Milestone Metrics
// =============================================================================

/// Milestone condition transitions applied through the gateway.
pub static MILESTONE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "milo_milestone_transitions_total",
            "Milestone condition transitions",
        ),
        &["kind", "to"],
    )
    .unwrap()
});

/// Worker processes spawned by the pipeline driver.
pub static WORKERS_SPAWNED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("milo_workers_spawned_total", "Worker processes spawned"),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Watchdog Metrics
// =============================================================================

/// Forced worker terminations by the lifetime watchdog.
pub static WATCHDOG_TERMINATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "milo_watchdog_terminations_total",
            "Workers terminated by the lifetime watchdog",
        ),
        &["kind", "reason"], // reason: "dwell", "run"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CALLS_DISPATCHED.clone()),
        Box::new(MILESTONE_TRANSITIONS.clone()),
        Box::new(WORKERS_SPAWNED.clone()),
        Box::new(WATCHDOG_TERMINATIONS.clone()),
    ]
}
