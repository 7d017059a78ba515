//! Prometheus metrics for the recommendation pipeline.
//!
//! Exposes per-controller request and result counters, per-stage latency and
//! generator outcomes, plus the actix handler for `/metrics`.

use crate::models::TeamName;
use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Duration;

static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_requests_total",
        "Pipeline invocations by controller and status (ok/error)",
        &["controller", "status"]
    )
    .expect("Failed to register recommendation requests metric")
});

static STAGE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "recommendation_stage_duration_seconds",
        "Duration of pipeline stages",
        &["team", "stage"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register recommendation stage duration metric")
});

static GENERATOR_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_generator_outcomes_total",
        "Generator calls by outcome (ok/timeout/error)",
        &["team", "generator", "outcome"]
    )
    .expect("Failed to register recommendation generator outcomes metric")
});

static RESULT_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "recommendation_result_size",
        "Number of ids returned per request",
        &["controller"],
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to register recommendation result size metric")
});

/// Record one finished invocation
pub fn record_request(controller: &str, status: &str) {
    REQUESTS_TOTAL.with_label_values(&[controller, status]).inc();
}

pub fn record_stage_duration(team: TeamName, stage: &str, duration: Duration) {
    STAGE_DURATION_SECONDS
        .with_label_values(&[team.as_str(), stage])
        .observe(duration.as_secs_f64());
}

pub fn record_generator_outcome(team: TeamName, generator: &str, outcome: &str) {
    GENERATOR_OUTCOMES_TOTAL
        .with_label_values(&[team.as_str(), generator, outcome])
        .inc();
}

pub fn record_result_size(controller: &str, size: usize) {
    RESULT_SIZE
        .with_label_values(&[controller])
        .observe(size as f64);
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
