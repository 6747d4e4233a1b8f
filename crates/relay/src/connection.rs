//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Eingehende Rahmen werden der Reihe nach vollstaendig
//! verarbeitet, bevor der naechste gelesen wird.
//!
//! ## State Machine
//! ```text
//! Verbunden -> Identifiziert(userId) -> Geschlossen
//!                  ^      |                  |
//!                  +------+  userOnline      |
//!                  +-------------------------+
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Kommt `verbindungs_timeout_sek` lang nichts (auch kein Pong), wird
//!   die Verbindung getrennt und wie jede andere aufgeraeumt

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use chatly_core::{UserId, VerbindungsId};
use chatly_protocol::{wire, ServerFrame};
use futures_util::{Sink, SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{RelayError, RelayResult};
use crate::server_state::RelayState;

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Session-Zustand einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, noch anonym
    Verbunden,
    /// Per `userOnline` als Benutzer identifiziert
    Identifiziert(UserId),
    /// Abgemeldet oder getrennt
    Geschlossen,
}

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<RelayState>,
    peer_addr: SocketAddr,
    verbindung_id: VerbindungsId,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischer VerbindungsId
    pub fn neu(state: Arc<RelayState>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            peer_addr,
            verbindung_id: VerbindungsId::new(),
        }
    }

    pub fn verbindung_id(&self) -> VerbindungsId {
        self.verbindung_id
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Keepalive ablaeuft oder ein
    /// Shutdown-Signal eingeht. Danach wird immer aufgeraeumt.
    pub async fn verarbeiten(self, socket: WebSocket, shutdown_rx: watch::Receiver<bool>) {
        let verbindung_id = self.verbindung_id;
        let peer_addr = self.peer_addr;

        let mut sende_rx = self
            .state
            .broadcaster
            .verbindung_registrieren(verbindung_id, self.state.config.sende_queue_groesse);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let mut ctx = DispatcherContext::neu(verbindung_id, peer_addr);

        tracing::info!(peer = %peer_addr, verbindung = %verbindung_id, "Neue Verbindung");

        let ergebnis = self
            .schleife(socket, &dispatcher, &mut ctx, &mut sende_rx, shutdown_rx)
            .await;
        match ergebnis {
            Ok(()) => {}
            Err(RelayError::Timeout) => {
                tracing::warn!(peer = %peer_addr, verbindung = %verbindung_id, "Verbindungs-Timeout");
            }
            Err(e) => {
                tracing::warn!(
                    peer = %peer_addr,
                    verbindung = %verbindung_id,
                    fehler = %e,
                    "Verbindung mit Fehler beendet"
                );
            }
        }

        let entfernt = dispatcher.verbindung_beendet(&mut ctx);
        tracing::info!(
            peer = %peer_addr,
            verbindung = %verbindung_id,
            benutzer = entfernt.len(),
            "Verbindungs-Task beendet"
        );
    }

    async fn schleife(
        &self,
        socket: WebSocket,
        dispatcher: &MessageDispatcher,
        ctx: &mut DispatcherContext,
        sende_rx: &mut mpsc::Receiver<ServerFrame>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> RelayResult<()> {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = self.state.config.keepalive_intervall();
        let timeout_dauer = self.state.config.timeout_dauer();

        let (mut sink, mut stream) = socket.split();

        // Zeitpunkt des letzten empfangenen Rahmens
        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                return Err(RelayError::Timeout);
            }

            let ping_verzoegerung = naechster_ping
                .saturating_duration_since(jetzt)
                .max(Duration::from_millis(1));

            tokio::select! {
                // Eingehender Rahmen vom Client
                nachricht = stream.next() => {
                    let Some(nachricht) = nachricht else {
                        tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                        return Ok(());
                    };
                    letzter_empfang = Instant::now();

                    match nachricht? {
                        Message::Text(text) => {
                            match dispatcher.text_verarbeiten(&text, ctx).await {
                                Ok(Some(antwort)) => {
                                    // Bereits eingereihte Rahmen gehen vor der Antwort raus
                                    while let Ok(rahmen) = sende_rx.try_recv() {
                                        rahmen_senden(&mut sink, &rahmen).await?;
                                    }
                                    rahmen_senden(&mut sink, &antwort).await?;
                                }
                                Ok(None) => {}
                                Err(e) if e.ist_verwerfbar() => {
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "Ungueltiger Rahmen verworfen"
                                    );
                                }
                                Err(e) => return Err(e),
                            }
                        }
                        Message::Binary(daten) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                laenge = daten.len(),
                                "Binaer-Rahmen verworfen"
                            );
                        }
                        Message::Ping(_) | Message::Pong(_) => {
                            tracing::trace!(peer = %peer_addr, "Keepalive empfangen");
                        }
                        Message::Close(grund) => {
                            tracing::info!(peer = %peer_addr, grund = ?grund, "Client hat geschlossen");
                            return Ok(());
                        }
                    }
                }

                // Ausgehender Rahmen aus dem Broadcaster
                Some(rahmen) = sende_rx.recv() => {
                    rahmen_senden(&mut sink, &rahmen).await?;
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if Instant::now() >= naechster_ping {
                        sink.send(Message::Ping(Vec::new())).await?;
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = Message::Close(Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: "Server wird heruntergefahren".into(),
                        }));
                        let _ = sink.send(abschied).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Serialisiert einen Rahmen und schreibt ihn als Text auf den Socket
async fn rahmen_senden<S>(sink: &mut S, rahmen: &ServerFrame) -> RelayResult<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let text = wire::kodieren(rahmen)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}
