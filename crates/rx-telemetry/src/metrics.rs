//! Prometheus metrics for the intake bot.
//!
//! All metrics follow the naming convention: `rx_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // WEBHOOK METRICS
    // =========================================================================

    /// Webhook deliveries by outcome (ok, invalid_signature, bad_payload)
    pub static ref WEBHOOK_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("rx_webhook_requests_total", "Webhook deliveries by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Time spent handling one webhook delivery
    pub static ref WEBHOOK_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "rx_webhook_duration_seconds",
            "Time spent handling one webhook delivery"
        ).buckets(exponential_buckets(0.005, 2.0, 12).unwrap_or_default())
    ).expect("metric creation failed");

    /// Events handled by kind (follow, image, text, skipped)
    pub static ref EVENTS_HANDLED: CounterVec = CounterVec::new(
        Opts::new("rx_events_total", "Webhook events by kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Redelivered events dropped by the de-duplication cache
    pub static ref EVENTS_DEDUPLICATED: Counter = Counter::new(
        "rx_events_deduplicated_total",
        "Redelivered webhook events skipped"
    ).expect("metric creation failed");

    /// Replies sent by reply kind
    pub static ref REPLIES_SENT: CounterVec = CounterVec::new(
        Opts::new("rx_replies_total", "Replies by kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Replies the chat platform refused
    pub static ref REPLY_FAILURES: Counter = Counter::new(
        "rx_reply_failures_total",
        "Reply API calls that failed"
    ).expect("metric creation failed");

    // =========================================================================
    // INTAKE METRICS
    // =========================================================================

    /// Prescription images stored locally
    pub static ref IMAGES_CAPTURED: Counter = Counter::new(
        "rx_intake_images_captured_total",
        "Prescription images stored"
    ).expect("metric creation failed");

    /// Intakes finalized
    pub static ref INTAKES_FINALIZED: Counter = Counter::new(
        "rx_intake_finalized_total",
        "Intakes that reached finalization"
    ).expect("metric creation failed");

    /// Artifact pipeline failures by step (local_check, upload, render, print)
    pub static ref ARTIFACT_FAILURES: CounterVec = CounterVec::new(
        Opts::new("rx_artifact_step_failures_total", "Artifact pipeline failures by step"),
        &["step"]
    ).expect("metric creation failed");

    /// Live conversations
    pub static ref ACTIVE_SESSIONS: Gauge = Gauge::new(
        "rx_intake_active_sessions",
        "Conversations currently in progress"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling it more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Webhook
        Box::new(WEBHOOK_REQUESTS.clone()),
        Box::new(WEBHOOK_DURATION.clone()),
        Box::new(EVENTS_HANDLED.clone()),
        Box::new(EVENTS_DEDUPLICATED.clone()),
        Box::new(REPLIES_SENT.clone()),
        Box::new(REPLY_FAILURES.clone()),
        // Intake
        Box::new(IMAGES_CAPTURED.clone()),
        Box::new(INTAKES_FINALIZED.clone()),
        Box::new(ARTIFACT_FAILURES.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_counter_increment() {
        IMAGES_CAPTURED.inc();
        assert!(IMAGES_CAPTURED.get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        ACTIVE_SESSIONS.set(3.0);
        assert_eq!(ACTIVE_SESSIONS.get(), 3.0);
    }

    #[test]
    fn test_encode_contains_registered_metrics() {
        register_metrics().unwrap();
        ARTIFACT_FAILURES.with_label_values(&["print"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("rx_artifact_step_failures_total"));
        assert!(text.contains("step=\"print\""));
    }
}
