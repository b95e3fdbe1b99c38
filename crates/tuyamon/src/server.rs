//! HTTP surface: metrics on `GET /`, control on `PUT /{device}`.
//!
//! Both routes answer 500 until the poll loop has completed a cycle, and
//! again after it fails.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use tuyamon_core::{ControlEndpoint, ControlOutcome, GaugeRegistry};

/// Shared server state.
pub struct AppState {
    pub gauges: Arc<GaugeRegistry>,
    pub control: ControlEndpoint,
    pub ready: watch::Receiver<bool>,
}

impl AppState {
    fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.is_ready() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match state.gauges.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_control(
    State(state): State<Arc<AppState>>,
    Path(device): Path<String>,
    body: Bytes,
) -> StatusCode {
    if !state.is_ready() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if !state.control.contains(&device) {
        return StatusCode::NOT_FOUND;
    }

    let fields = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => {
            debug!(device = %device, "rejecting control body that is not a JSON object");
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.control.submit(&device, fields) {
        ControlOutcome::Accepted(_) => StatusCode::NO_CONTENT,
        ControlOutcome::NotFound => StatusCode::NOT_FOUND,
    }
}

/// Build the axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_metrics))
        .route("/{device}", put(handle_control))
        .with_state(Arc::new(state))
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, build_router(state)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use tuyamon_core::fake::{FakeCloud, SOCKET_PRODUCT};
    use tuyamon_core::{DeviceRegistry, PollLoop, PollTimings};

    async fn app(run_cycle: bool) -> (Arc<FakeCloud>, Router) {
        let cloud = Arc::new(FakeCloud::new());
        cloud.add_device("g1", "d1", "Kitchen Plug", SOCKET_PRODUCT, None);
        cloud.set_data_points("d1", json!({ "1": 1, "4": 500, "5": 100, "6": 2300 }));

        let timings = PollTimings::default();
        let gauges = Arc::new(GaugeRegistry::new());
        let registry = Arc::new(DeviceRegistry::new(
            cloud.clone(),
            gauges.clone(),
            timings.inactive_timeout,
        ));
        let poll = PollLoop::new(cloud.clone(), registry.clone(), timings);
        poll.startup().await.unwrap();
        if run_cycle {
            poll.cycle().await.unwrap();
        }

        let router = build_router(AppState {
            gauges,
            control: ControlEndpoint::new(registry),
            ready: poll.ready(),
        });
        (cloud, router)
    }

    fn put_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get_metrics() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    async fn wait_for_publish(cloud: &FakeCloud) {
        for _ in 0..100 {
            if !cloud.published().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no publish observed");
    }

    #[tokio::test]
    async fn not_ready_answers_500() {
        let (cloud, app) = app(false).await;

        let response = app.clone().oneshot(get_metrics()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        let response = app
            .oneshot(put_request("/kitchen_plug", r#"{"power_on":0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(cloud.published().is_empty());
    }

    #[tokio::test]
    async fn metrics_after_first_cycle() {
        let (_cloud, app) = app(true).await;

        let response = app.oneshot(get_metrics()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            prometheus::TEXT_FORMAT
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        for field in ["power_on", "current", "power", "voltage", "va", "pf"] {
            assert!(
                text.contains(&format!("{field}{{name=\"Kitchen Plug\"}}")),
                "missing {field} in:\n{text}"
            );
        }
    }

    #[tokio::test]
    async fn unknown_device_is_404() {
        let (_cloud, app) = app(true).await;
        let response = app
            .oneshot(put_request("/garage", r#"{"power_on":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_object_body_is_400() {
        let (_cloud, app) = app(true).await;
        for body in ["[1,2]", "not json", ""] {
            let response = app
                .clone()
                .oneshot(put_request("/kitchen_plug", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body:?}");
        }
    }

    #[tokio::test]
    async fn put_forwards_settable_fields() {
        let (cloud, app) = app(true).await;

        let response = app
            .oneshot(put_request("/Kitchen%20Plug", r#"{"power_on":0,"voltage":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        wait_for_publish(&cloud).await;
        let published = cloud.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].device_id, "d1");
        assert_eq!(published[0].dps.get("1"), Some(&json!(false)));
        assert!(!published[0].dps.contains_key("6"));
    }
}
