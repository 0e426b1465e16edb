//! # Rx Telemetry
//!
//! Logging and Prometheus metrics for the intake bot.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rx_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RX_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `RX_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `RX_SERVICE_NAME` | `rx-intake` | Service name in startup logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, ACTIVE_SESSIONS, ARTIFACT_FAILURES, EVENTS_DEDUPLICATED,
    EVENTS_HANDLED, IMAGES_CAPTURED, INTAKES_FINALIZED, REPLIES_SENT, REPLY_FAILURES,
    WEBHOOK_DURATION, WEBHOOK_REQUESTS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    // Metrics first so early events are counted
    register_metrics()?;
    logging::init_logging(&config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
