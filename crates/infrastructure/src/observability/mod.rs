//! Observability: structured logging, process metrics and the scrape endpoint

pub mod latest_value;
pub mod metrics_collector;
pub mod metrics_server;
pub mod structured_logger;
pub mod telemetry_setup;

pub use latest_value::{LatestValueCollector, MetricDescriptor, MetricSample};
pub use metrics_collector::{TaskMetrics, TaskOutcome};
pub use metrics_server::MetricsServer;
pub use structured_logger::StructuredLogger;
pub use telemetry_setup::{init_logging, install_metrics_recorder};
