//! Fehlertypen fuer das Relay

use chatly_protocol::ProtokollFehler;
use thiserror::Error;

/// Fehlertyp fuer das Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// IO-Fehler (Listener, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Fehler beim Lesen oder Schreiben
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] axum::Error),

    /// Eingehender Rahmen nicht dekodierbar
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtokollFehler),

    /// Ausgehender Rahmen nicht serialisierbar
    #[error("Serialisierungsfehler: {0}")]
    Serialisierung(#[from] serde_json::Error),

    /// Keepalive-Timeout
    #[error("Timeout")]
    Timeout,
}

impl RelayError {
    /// Gibt true zurueck wenn die Verbindung danach weiterlaufen kann
    ///
    /// Nur kaputte Eingangsrahmen sind harmlos; sie werden verworfen.
    pub fn ist_verwerfbar(&self) -> bool {
        matches!(self, Self::Protokoll(_))
    }
}

/// Result-Typ fuer das Relay
pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protokollfehler_sind_verwerfbar() {
        let fehler: RelayError = ProtokollFehler::UnbekanntesEvent("joinRoom".into()).into();
        assert!(fehler.ist_verwerfbar());
        assert!(!RelayError::Timeout.ist_verwerfbar());
    }

    #[test]
    fn fehlertext() {
        assert_eq!(RelayError::Timeout.to_string(), "Timeout");
        let fehler: RelayError = ProtokollFehler::UnbekanntesEvent("joinRoom".into()).into();
        assert!(fehler.to_string().starts_with("Protokollfehler: "));
    }
}
