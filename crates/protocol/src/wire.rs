//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jedes Event ist ein JSON-Text-Rahmen:
//!
//! ```text
//! Client -> Relay:  {"event": "userLogout", "data": 42, "ack": 7}
//! Relay -> Client:  {"event": "onlineUsers", "data": [1, 2]}
//!                   {"ack": 7, "data": "ok"}
//! ```
//!
//! `ack` ist optional; nur Events mit Bestaetigung werten es aus.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ausgang::ServerFrame;
use crate::eingang::ClientEvent;

/// Fehler beim Dekodieren eingehender Rahmen
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    /// Rahmen ist kein gueltiges JSON oder hat keinen Event-Namen
    #[error("Ungueltiger Rahmen: {0}")]
    UngueltigerRahmen(#[source] serde_json::Error),

    /// Event-Name ist nicht bekannt
    #[error("Unbekanntes Event: {0}")]
    UnbekanntesEvent(String),

    /// Payload passt nicht zum Event
    #[error("Ungueltiger Payload fuer '{event}': {quelle}")]
    UngueltigerPayload {
        event: String,
        #[source]
        quelle: serde_json::Error,
    },
}

/// Ein eingehender Text-Rahmen vor der Event-Dekodierung
#[derive(Debug, Clone, Deserialize)]
pub struct EingangsRahmen {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<u64>,
}

impl EingangsRahmen {
    /// Liest einen Rahmen aus einem WebSocket-Text
    pub fn parsen(text: &str) -> Result<Self, ProtokollFehler> {
        serde_json::from_str(text).map_err(ProtokollFehler::UngueltigerRahmen)
    }

    /// Dekodiert den Payload zum typisierten Event
    pub fn event(self) -> Result<(ClientEvent, Option<u64>), ProtokollFehler> {
        let event = ClientEvent::dekodieren(&self.event, self.data)?;
        Ok((event, self.ack))
    }
}

/// Dekodiert einen Text-Rahmen in einem Schritt
pub fn dekodieren(text: &str) -> Result<(ClientEvent, Option<u64>), ProtokollFehler> {
    EingangsRahmen::parsen(text)?.event()
}

/// Serialisiert einen ausgehenden Rahmen zu Text
pub fn kodieren(frame: &ServerFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}
