//! Fehlertypen fuer Chatly
//!
//! Zentraler Fehler-Enum fuer alles, was ausserhalb eines einzelnen Crates
//! sichtbar wird. Untermodule koennen eigene Fehler definieren und via
//! `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Chatly
pub type Result<T> = std::result::Result<T, ChatlyError>;

/// Alle crate-uebergreifenden Fehler im Chatly-Relay
#[derive(Debug, Error)]
pub enum ChatlyError {
    // --- Externes Backend ---
    #[error("Gruppen-Abgleich fehlgeschlagen: {0}")]
    GruppenAbgleich(String),

    // --- Sonstiges ---
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ChatlyError {
    /// Erstellt einen Abgleich-Fehler des externen Gruppen-Backends
    pub fn gruppen_abgleich(msg: impl Into<String>) -> Self {
        Self::GruppenAbgleich(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    ///
    /// Das Relay selbst wiederholt nichts; die Einordnung landet nur im Log.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::GruppenAbgleich(_))
    }
}
