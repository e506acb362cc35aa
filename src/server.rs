use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::broadcast::AppState;
use crate::live_status::LiveStatus;

/// Radar consumers connect with a websocket on `/` or `/ws`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

async fn status_handler(State(state): State<AppState>) -> Json<LiveStatus> {
    let mut status = state.status.read().await.clone();
    status.touch();
    status.consumers = state.consumers();
    Json(status)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.snapshots.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    log::info!("Radar consumer connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(json) => {
                    if let Err(e) = sender.send(Message::Text(json)).await {
                        log::debug!("Consumer send failed: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Consumer lagging, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Consumers only ever send pings, answered by axum.
                Some(Ok(_)) => {}
            },
        }
    }

    log::info!("Radar consumer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car_class::CarClassTable;
    use crate::radar::Radar;
    use crate::telemetry::{SimulatedSource, SimulationConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        let radar = Radar::new(
            Box::new(SimulatedSource::new(SimulationConfig::default())),
            CarClassTable::default(),
            4000.0,
        );
        AppState::new(radar, 20.0)
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let response = router(state())
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["connected"], false);
        assert_eq!(value["update_rate_hz"], 20.0);
        assert!(value["source"].as_str().unwrap().starts_with("simulation"));
    }

    #[tokio::test]
    async fn test_plain_get_on_ws_route_rejected() {
        for uri in ["/", "/ws"] {
            let response = router(state())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status().is_client_error(), "{} answered {}", uri, response.status());
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router(state())
            .oneshot(Request::builder().uri("/radar").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
