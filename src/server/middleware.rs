use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::telemetry::HTTP_REQUESTS;

/// Logs every request with its status and latency and counts it in
/// `http_requests_total`.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    HTTP_REQUESTS
        .with_label_values(&[method.as_str(), status.as_str()])
        .inc();
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), elapsed_ms, "Request failed");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), elapsed_ms, "Handled request");
    }
    response
}
