// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros and
//! an Axum-compatible metrics handler.

use std::{sync::LazyLock, time::Instant};

use api_client::UpstreamError;
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, Histogram, HistogramVec, IntCounterVec, TextEncoder, register_histogram,
    register_histogram_vec, register_int_counter_vec,
};
use tracing::error;

/// Rate limiter decisions, labeled by route and decision.
pub static RATE_LIMIT_DECISIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "slp_gateway_rate_limit_decisions_total",
        "Total number of rate limiter decisions, labeled by route and decision",
        &["route", "decision"]
    )
    .expect("Failed to create slp_gateway_rate_limit_decisions_total counter vec")
});

/// Histogram for upstream request durations in seconds.
pub static UPSTREAM_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "slp_gateway_upstream_request_duration",
        "Upstream request durations in seconds",
        &["upstream", "result"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to create upstream request duration histogram")
});

/// Histogram for whole bulk validation durations in seconds.
pub static BULK_VALIDATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "slp_gateway_bulk_validation_duration",
        "Bulk validation durations in seconds",
        &["outcome"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to create bulk validation duration histogram")
});

/// Histogram for the number of txids per accepted bulk request.
pub static BULK_VALIDATION_SIZE: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "slp_gateway_bulk_validation_size",
        "Number of txids per bulk validation request",
        vec![1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to create bulk validation size histogram")
});

/// Count one rate limiter decision
pub fn record_rate_limit_decision(route: &str, allowed: bool) {
    let decision = if allowed { "allowed" } else { "rejected" };
    RATE_LIMIT_DECISIONS
        .with_label_values(&[route, decision])
        .inc();
}

/// Observe the duration of an upstream request
///
/// # Arguments
/// * `upstream` - The upstream client name
/// * `result` - `ok` or the error kind label
/// * `duration_secs` - The duration of the request in seconds
pub fn observe_upstream_duration(upstream: &str, result: &str, duration_secs: f64) {
    UPSTREAM_REQUEST_DURATION
        .with_label_values(&[upstream, result])
        .observe(duration_secs);
}

/// Await an upstream call and record its duration and result
pub async fn timed_upstream_call<T>(
    upstream: &str,
    call: impl Future<Output = Result<T, UpstreamError>>,
) -> Result<T, UpstreamError> {
    let start_time = Instant::now();
    let result = call.await;
    let label = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind_label(),
    };
    observe_upstream_duration(upstream, label, start_time.elapsed().as_secs_f64());
    result
}

/// Observe one finished bulk validation
pub fn observe_bulk_validation(outcome: &str, size: usize, duration_secs: f64) {
    BULK_VALIDATION_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
    #[allow(clippy::cast_precision_loss)]
    BULK_VALIDATION_SIZE.observe(size as f64);
}

/// Axum handler that exports metrics in Prometheus text format
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics buffer is not valid UTF-8");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timed_call_passes_result_through() {
        let ok = timed_upstream_call("unit_test", async { Ok::<_, UpstreamError>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = timed_upstream_call("unit_test", async {
            Err::<u8, _>(UpstreamError::malformed("bad"))
        })
        .await;
        assert!(err.is_err());

        let count = UPSTREAM_REQUEST_DURATION
            .with_label_values(&["unit_test", "malformed"])
            .get_sample_count();
        assert!(count >= 1);
    }

    #[tokio::test]
    async fn handler_exports_text_format() {
        record_rate_limit_decision("GET /unit", true);
        let response = metrics_handler().await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("slp_gateway_rate_limit_decisions_total"));
    }
}
