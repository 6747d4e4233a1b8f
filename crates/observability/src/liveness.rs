//! Liveness-Endpunkt fuer Chatly
//!
//! Endpoint: `GET /`
//! Response: fester Text, Status 200. Eine weitere REST-Oberflaeche gibt es
//! nicht; alles andere laeuft ueber den WebSocket.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};

/// Fester Antworttext des Liveness-Checks
pub const LIVENESS_TEXT: &str = "Chatly backend (private chat) server is running....";

/// Axum-Router fuer den `/`-Endpunkt
///
/// Generisch ueber den State, damit er in jeden Relay-Router gemergt
/// werden kann.
pub fn liveness_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/", get(liveness_handler))
}

/// `GET /` – meldet dass der Prozess laeuft
async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, LIVENESS_TEXT)
}
