//! HTTP-/WebSocket-Server – Bindet Socket, nimmt Verbindungen an
//!
//! Der `RelayServer` stellt zwei Routen bereit:
//! - `GET /`       – Liveness-Text
//! - `GET /socket` – WebSocket-Upgrade, danach eine `ClientConnection`
//!                   pro Verbindung in einem eigenen tokio-Task
//!
//! Upgrades mit einem `Origin` ausserhalb der Allow-List werden mit 403
//! abgelehnt. Eine leere Liste erlaubt alle Origins.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chatly_observability::{liveness_router, request_timing_layer, timing_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::connection::ClientConnection;
use crate::error::RelayResult;
use crate::server_state::RelayState;

/// Pfad des WebSocket-Endpunkts
pub const SOCKET_PFAD: &str = "/socket";

/// Router-State: Relay-Zustand plus Shutdown-Signal fuer neue Verbindungen
#[derive(Clone)]
struct SocketState {
    relay: Arc<RelayState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// WebSocket-Relay-Server
pub struct RelayServer {
    state: Arc<RelayState>,
    bind_addr: SocketAddr,
}

impl RelayServer {
    /// Erstellt einen neuen RelayServer
    pub fn neu(state: Arc<RelayState>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Baut den vollstaendigen Axum-Router
    pub fn router(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        let socket_state = SocketState {
            relay: Arc::clone(&self.state),
            shutdown_rx,
        };

        Router::new()
            .route(SOCKET_PFAD, get(socket_handler))
            .with_state(socket_state)
            .merge(liveness_router())
            .layer(axum::middleware::from_fn(timing_middleware))
            .layer(request_timing_layer())
            .layer(cors_layer(&self.state.config.cors_origins))
    }

    /// Bindet den Socket und bedient Anfragen bis zum Shutdown-Signal
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> RelayResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.auf_listener_starten(listener, shutdown_rx).await
    }

    /// Bedient Anfragen auf einem bereits gebundenen Listener
    pub async fn auf_listener_starten(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> RelayResult<()> {
        let lokale_addr = listener.local_addr()?;
        let app = self.router(shutdown_rx.clone());

        tracing::info!(adresse = %lokale_addr, pfad = SOCKET_PFAD, "Relay-Server gestartet");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(auf_shutdown_warten(shutdown_rx))
        .await?;

        tracing::info!(
            uptime_sek = self.state.uptime_sek(),
            online = self.state.presence.online_anzahl(),
            "Relay-Server gestoppt"
        );
        Ok(())
    }
}

/// Wartet bis das Shutdown-Signal `true` wird (oder der Sender wegfaellt)
async fn auf_shutdown_warten(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
    tracing::info!("Relay-Server: Shutdown-Signal empfangen");
}

/// `GET /socket` – prueft den Origin und startet die Verbindung
async fn socket_handler(
    State(state): State<SocketState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let peer_addr = connect_info
        .map(|ConnectInfo(addr)| addr)
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));

    let origin = headers.get(header::ORIGIN);
    if !origin_erlaubt(&state.relay.config.cors_origins, origin) {
        tracing::warn!(
            peer = %peer_addr,
            origin = ?origin,
            "WebSocket-Upgrade mit fremdem Origin abgelehnt"
        );
        return StatusCode::FORBIDDEN.into_response();
    }

    let verbindung = ClientConnection::neu(Arc::clone(&state.relay), peer_addr);
    tracing::debug!(peer = %peer_addr, verbindung = %verbindung.verbindung_id(), "Upgrade akzeptiert");

    let shutdown_rx = state.shutdown_rx.clone();
    ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}

/// Prueft einen `Origin`-Header gegen die Allow-List
///
/// Ohne Header (Nicht-Browser-Clients) oder mit leerer Liste ist alles erlaubt.
pub fn origin_erlaubt(erlaubt: &[String], origin: Option<&HeaderValue>) -> bool {
    if erlaubt.is_empty() {
        return true;
    }
    match origin.map(HeaderValue::to_str) {
        None => true,
        Some(Ok(origin)) => erlaubt.iter().any(|e| e == origin),
        Some(Err(_)) => false,
    }
}

/// CORS-Layer fuer die konfigurierten Origins (GET/POST)
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    if origins.is_empty() {
        return layer.allow_origin(AllowOrigin::any());
    }

    let werte: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(wert) => Some(wert),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ungueltiger CORS-Origin ignoriert");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(werte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::RelayConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chatly_observability::LIVENESS_TEXT;
    use tower::ServiceExt;

    fn erlaubt() -> Vec<String> {
        RelayConfig::default().cors_origins
    }

    #[test]
    fn origin_aus_liste() {
        let origin = HeaderValue::from_static("http://localhost:5173");
        assert!(origin_erlaubt(&erlaubt(), Some(&origin)));
    }

    #[test]
    fn fremder_origin() {
        let origin = HeaderValue::from_static("https://boese.example");
        assert!(!origin_erlaubt(&erlaubt(), Some(&origin)));
    }

    #[test]
    fn ohne_origin_oder_leere_liste() {
        let origin = HeaderValue::from_static("https://boese.example");
        assert!(origin_erlaubt(&erlaubt(), None));
        assert!(origin_erlaubt(&[], Some(&origin)));
    }

    #[tokio::test]
    async fn router_liefert_liveness() {
        let state = RelayState::neu(RelayConfig::default());
        let server = RelayServer::neu(state, SocketAddr::from(([127, 0, 0, 1], 0)));
        let (_tx, rx) = watch::channel(false);

        let antwort = server
            .router(rx)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(antwort.status(), StatusCode::OK);
        let body = to_bytes(antwort.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], LIVENESS_TEXT.as_bytes());
    }

    #[tokio::test]
    async fn socket_ohne_upgrade_wird_abgelehnt() {
        let state = RelayState::neu(RelayConfig::default());
        let server = RelayServer::neu(state, SocketAddr::from(([127, 0, 0, 1], 0)));
        let (_tx, rx) = watch::channel(false);

        let antwort = server
            .router(rx)
            .oneshot(Request::builder().uri(SOCKET_PFAD).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(antwort.status().is_client_error());
    }
}
