//! HTTP / WebSocket surface.

pub mod monitor;
pub mod signal;
pub mod tick;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Ingress ───────────────────────────────────────────────────────────
        .route("/signal", post(signal::receive_signal))
        .route("/tick",   post(tick::push_tick))
        // ── Monitor ───────────────────────────────────────────────────────────
        .route("/state",  get(monitor::get_state))
        .route("/health", get(monitor::health_check))
        .route("/ws",     get(monitor::ws_monitor))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::state::build_state;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_text(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_tick(price: f64) -> Request<Body> {
        Request::post("/tick")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"price":{price},"time":"t"}}"#)))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_signal_without_direction_is_400() {
        let app = build_router(build_state("http"));
        let (status, body) = send(&app, post_text("/signal", "no direction here")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_entry_cross_exit_flow() {
        let app = build_router(build_state("http"));

        send(&app, post_tick(95.0)).await;
        let (status, body) = send(
            &app,
            post_text("/signal", "Accepted Entry + priorRisePct=0.05 | stopPx=100 | sym=BTCUSDT"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "ACCEPTED");
        assert_eq!(body["event"]["kind"], "ENTRY_SIGNAL");
        assert_eq!(body["signal"]["threshold"], 100);

        let (_, body) = send(&app, post_tick(95.0)).await;
        assert_eq!(body["events"].as_array().unwrap().len(), 0);

        let (_, body) = send(&app, post_tick(101.0)).await;
        assert_eq!(body["events"][0]["kind"], "LTP_CROSS_UP");
        assert_eq!(body["events"][0]["pnl"], 6.0);

        let (_, body) = send(&app, get("/state")).await;
        assert_eq!(body["state"]["phase"], "POSITION");
        assert_eq!(body["state"]["paper_pnl"], 6.0);

        let (_, body) = send(&app, post_text("/signal", "exit")).await;
        assert_eq!(body["event"]["kind"], "EXIT_SIGNAL");
        assert_eq!(body["event"]["pnl"], 6.0);

        let (_, body) = send(&app, get("/state")).await;
        assert_eq!(body["state"]["phase"], "NO_POSITION");
        assert!(body["state"]["position"].is_null());
    }

    #[tokio::test]
    async fn test_rejected_signal_is_not_an_error() {
        let app = build_router(build_state("http"));
        let (status, body) = send(&app, post_text("/signal", "Exit now")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "REJECTED");
        assert_eq!(body["phase"], "NO_POSITION");
    }

    #[tokio::test]
    async fn test_signal_keeps_raw_body_untouched() {
        let app  = build_router(build_state("http"));
        let text = "  Entry | stopPx=100\n";
        let (status, body) = send(&app, post_text("/signal", text)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signal"]["raw"], text);
        assert_eq!(body["signal"]["threshold"], 100);
    }

    #[tokio::test]
    async fn test_tick_response_state_matches_events() {
        let app = build_router(build_state("http"));
        send(&app, post_tick(95.0)).await;
        send(&app, post_text("/signal", "entry stopPx=100")).await;
        send(&app, post_tick(95.0)).await;

        let (_, body) = send(&app, post_tick(101.0)).await;
        assert_eq!(body["events"][0]["kind"], "LTP_CROSS_UP");
        assert_eq!(body["state"]["current_price"], 101.0);
        assert_eq!(body["state"]["paper_pnl"], body["events"][0]["pnl"]);
    }

    #[tokio::test]
    async fn test_health_reports_counters() {
        let app = build_router(build_state("csv"));
        send(&app, post_tick(1.0)).await;
        send(&app, post_tick(2.0)).await;

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "csv");
        assert_eq!(body["tick_count"], 2);
        assert_eq!(body["phase"], "NO_POSITION");
    }
}
