//! Event-Broadcaster – Send-Queues aller offenen Verbindungen
//!
//! Jede WebSocket-Verbindung registriert beim Aufbau eine begrenzte
//! Send-Queue unter ihrer `VerbindungsId`. Router und Presence-Registry
//! legen Rahmen nur in diese Queues; geschrieben wird ausschliesslich vom
//! Verbindungs-Task.
//!
//! ## Zustellung
//! - An eine Verbindung: `an_verbindung_senden`
//! - An alle Verbindungen (auch anonyme): `an_alle_senden`
//! - Presence-Snapshot an alle: `online_nutzer_veroeffentlichen`
//!
//! Volle oder geschlossene Queues verwerfen den Rahmen mit einer Log-Zeile.

use chatly_core::{UserId, VerbindungsId};
use chatly_protocol::{ServerEvent, ServerFrame};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindung_id: VerbindungsId,
    pub tx: mpsc::Sender<ServerFrame>,
}

impl ClientSender {
    /// Legt einen Rahmen nicht-blockierend in die Queue
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, rahmen: ServerFrame) -> bool {
        match self.tx.try_send(rahmen) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(verworfen)) => {
                tracing::warn!(
                    verbindung = %self.verbindung_id,
                    rahmen = rahmen_name(&verworfen),
                    "Send-Queue voll – Rahmen verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    verbindung = %self.verbindung_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

fn rahmen_name(rahmen: &ServerFrame) -> &'static str {
    match rahmen {
        ServerFrame::Event(event) => event.name(),
        ServerFrame::Ack(_) => "ack",
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Registry aller Send-Queues, indiziert nach Verbindung
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    verbindungen: DashMap<VerbindungsId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                verbindungen: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und schreibt auf den
    /// WebSocket.
    pub fn verbindung_registrieren(
        &self,
        verbindung_id: VerbindungsId,
        queue_groesse: usize,
    ) -> mpsc::Receiver<ServerFrame> {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        let sender = ClientSender { verbindung_id, tx };
        self.inner.verbindungen.insert(verbindung_id, sender);
        tracing::debug!(verbindung = %verbindung_id, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung aus dem Broadcaster
    pub fn verbindung_entfernen(&self, verbindung_id: &VerbindungsId) {
        if self.inner.verbindungen.remove(verbindung_id).is_some() {
            tracing::debug!(verbindung = %verbindung_id, "Verbindung aus Broadcaster entfernt");
        }
    }

    /// Sendet einen Rahmen an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung bekannt ist und der Rahmen
    /// eingereiht wurde.
    pub fn an_verbindung_senden(
        &self,
        verbindung_id: &VerbindungsId,
        rahmen: impl Into<ServerFrame>,
    ) -> bool {
        match self.inner.verbindungen.get(verbindung_id) {
            Some(sender) => sender.senden(rahmen.into()),
            None => {
                tracing::debug!(verbindung = %verbindung_id, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Sendet einen Rahmen an alle offenen Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, rahmen: impl Into<ServerFrame>) -> usize {
        let rahmen = rahmen.into();
        let mut gesendet = 0;
        self.inner.verbindungen.iter().for_each(|entry| {
            if entry.value().senden(rahmen.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Verteilt die aktuelle Online-Liste an alle Verbindungen
    pub fn online_nutzer_veroeffentlichen(&self, online: Vec<UserId>) -> usize {
        let anzahl = online.len();
        let gesendet = self.an_alle_senden(ServerEvent::OnlineUsers(online));
        tracing::debug!(online = anzahl, empfaenger = gesendet, "Online-Liste verteilt");
        gesendet
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, verbindung_id: &VerbindungsId) -> bool {
        self.inner.verbindungen.contains_key(verbindung_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
