//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage und protokolliert sie als
//! strukturiertes Log-Event. WebSocket-Upgrades (101) sind nach dem
//! Handshake abgeschlossen und werden nur auf debug geloggt; die Dauer der
//! eigentlichen Verbindung protokolliert der Verbindungs-Task.

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    middleware::Next,
};
use std::time::Instant;

/// Erstellt den tower-http Trace-Layer fuer HTTP-Spans.
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}

/// Axum-Middleware-Funktion: misst Antwortzeit und loggt strukturiert.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn(timing_middleware))
/// ```
pub async fn timing_middleware(req: Request<Body>, next: Next) -> Response<Body> {
    let methode = req.method().clone();
    let pfad = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    match protokoll_stufe(status) {
        Stufe::Debug => tracing::debug!(
            method = %methode,
            path = %pfad,
            status = status.as_u16(),
            duration_ms = dauer_ms,
            "WebSocket-Upgrade abgeschlossen"
        ),
        Stufe::Info => tracing::info!(
            method = %methode,
            path = %pfad,
            status = status.as_u16(),
            duration_ms = dauer_ms,
            "HTTP-Anfrage abgeschlossen"
        ),
        Stufe::Warn => tracing::warn!(
            method = %methode,
            path = %pfad,
            status = status.as_u16(),
            duration_ms = dauer_ms,
            "HTTP-Anfrage abgelehnt"
        ),
    }

    response
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stufe {
    Debug,
    Info,
    Warn,
}

fn protokoll_stufe(status: StatusCode) -> Stufe {
    if status == StatusCode::SWITCHING_PROTOCOLS {
        Stufe::Debug
    } else if status.is_client_error() || status.is_server_error() {
        Stufe::Warn
    } else {
        Stufe::Info
    }
}
