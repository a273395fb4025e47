//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Render jobs (outcomes, durations, busy rejections)
//! - Wizard navigation (probe counts, driver failures)
//! - Retrieval and transcoding

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Render Jobs
// =============================================================================

/// Finished render jobs by result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sketchloop_jobs_total", "Total render jobs finished"),
        &["result"], // "transcoded", "degraded", "error"
    )
    .unwrap()
});

/// Render job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sketchloop_job_duration_seconds",
            "Duration of a render job from admission to final record",
        )
        .buckets(vec![5.0, 10.0, 20.0, 30.0, 60.0, 90.0, 120.0, 180.0, 300.0, 600.0]),
        &["result"],
    )
    .unwrap()
});

/// Submissions rejected because a job was already in flight.
pub static BUSY_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sketchloop_busy_rejections_total",
        "Total submissions rejected while the renderer was busy",
    )
    .unwrap()
});

// =============================================================================
// Driver
// =============================================================================

/// Wizard probes used per job.
pub static WIZARD_ATTEMPTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sketchloop_wizard_attempts",
            "Number of wizard-loop probes per job",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 12.0, 16.0, 20.0]),
        &["reached_terminal"],
    )
    .unwrap()
});

/// Driver failures by kind.
pub static DRIVER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sketchloop_driver_failures_total", "Total driver failures"),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Retrieval & Transcoding
// =============================================================================

/// Video downloads that failed and fell back to a screenshot.
pub static DOWNLOAD_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sketchloop_download_failures_total",
        "Total video downloads that failed",
    )
    .unwrap()
});

/// Transcode duration in seconds.
pub static TRANSCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sketchloop_transcode_duration_seconds",
            "Duration of ffmpeg transcodes",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["format", "result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(BUSY_REJECTIONS.clone()),
        // Driver
        Box::new(WIZARD_ATTEMPTS.clone()),
        Box::new(DRIVER_FAILURES.clone()),
        // Retrieval & transcoding
        Box::new(DOWNLOAD_FAILURES.clone()),
        Box::new(TRANSCODE_DURATION.clone()),
    ]
}
