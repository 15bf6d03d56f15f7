//! Scrape endpoint: Prometheus recorder output followed by the latest-value gauges

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::latest_value::LatestValueCollector;

#[derive(Clone)]
struct MetricsState {
    handle: Option<PrometheusHandle>,
    latest: Arc<LatestValueCollector>,
}

pub struct MetricsServer {
    address: SocketAddr,
    path: String,
    state: MetricsState,
}

impl MetricsServer {
    pub fn new(
        address: SocketAddr,
        path: impl Into<String>,
        handle: Option<PrometheusHandle>,
        latest: Arc<LatestValueCollector>,
    ) -> Self {
        Self {
            address,
            path: path.into(),
            state: MetricsState { handle, latest },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.path, get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    /// 运行到取消令牌触发为止
    pub async fn serve(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.address).await?;
        info!(address = %self.address, path = %self.path, "Metrics server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}

pub fn render(handle: Option<&PrometheusHandle>, latest: &LatestValueCollector) -> String {
    let mut body = handle.map(PrometheusHandle::render).unwrap_or_default();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body.push_str(&latest.render());
    body
}

async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render(state.handle.as_ref(), &state.latest),
    )
}

async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MetricDescriptor, MetricSample};

    #[test]
    fn test_render_without_recorder_contains_latest_values() {
        let latest = LatestValueCollector::new();
        latest
            .describe(MetricDescriptor {
                name: "inventory_aws_vpcs",
                help: "VPCs written by the last cycle",
                labels: &["partition"],
            })
            .unwrap();
        latest.add_metric(
            "aws:collect-vpcs/111/eu-west-1",
            MetricSample::new("inventory_aws_vpcs", vec!["111/eu-west-1".into()], 4.0),
        );

        let body = render(None, &latest);
        assert!(body.contains(r#"inventory_aws_vpcs{partition="111/eu-west-1"} 4"#));
        assert!(body.contains("# HELP inventory_aws_vpcs VPCs written by the last cycle"));
        assert!(!render(None, &latest).contains("111/eu-west-1"));
    }
}
