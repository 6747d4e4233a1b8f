//! Gemeinsamer Relay-Zustand
//!
//! Haelt Konfiguration, Presence-Registry, Broadcaster und den Abgleich-Hook
//! zum Gruppen-Backend. Wird als `Arc<RelayState>` zwischen allen
//! Verbindungs-Tasks geteilt.

use chatly_core::{GruppenAbgleich, KeinAbgleich, UserId};
use chatly_protocol::ServerEvent;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::broadcast::EventBroadcaster;
use crate::presence::PresenceRegistry;

/// Konfiguration fuer das Relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer stille Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Groesse der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Erlaubte Origins fuer CORS und WebSocket-Upgrade (leer = alle)
    pub cors_origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            sende_queue_groesse: 64,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "https://chatly-app-pearl.vercel.app".to_string(),
            ],
        }
    }
}

impl RelayConfig {
    /// Abstand zwischen zwei Pings, mindestens eine Sekunde
    pub fn keepalive_intervall(&self) -> Duration {
        Duration::from_secs(self.keepalive_sek.max(1))
    }

    /// Stille, nach der eine Verbindung getrennt wird
    ///
    /// Nie kuerzer als ein Keepalive-Intervall, sonst liefe jede
    /// Verbindung ab bevor der erste Pong zurueckkommen kann.
    pub fn timeout_dauer(&self) -> Duration {
        Duration::from_secs(self.verbindungs_timeout_sek).max(self.keepalive_intervall())
    }
}

/// Gemeinsamer Relay-Zustand (thread-safe, Arc-geteilt)
pub struct RelayState {
    /// Relay-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Wer ist online, unter welcher Verbindung
    pub presence: PresenceRegistry,
    /// Send-Queues aller Verbindungen
    pub broadcaster: EventBroadcaster,
    /// Hook zum externen Gruppen-Backend
    pub gruppen_abgleich: Arc<dyn GruppenAbgleich>,
    /// Startzeitpunkt (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl RelayState {
    /// Erstellt einen neuen RelayState mit dem Standard-Abgleich
    pub fn neu(config: RelayConfig) -> Arc<Self> {
        Self::mit_abgleich(config, Arc::new(KeinAbgleich))
    }

    /// Erstellt einen neuen RelayState mit eigenem Gruppen-Abgleich
    pub fn mit_abgleich(
        config: RelayConfig,
        gruppen_abgleich: Arc<dyn GruppenAbgleich>,
    ) -> Arc<Self> {
        let broadcaster = EventBroadcaster::neu();
        Arc::new(Self {
            config: Arc::new(config),
            presence: PresenceRegistry::neu(broadcaster.clone()),
            broadcaster,
            gruppen_abgleich,
            start_time: Instant::now(),
        })
    }

    /// Sendet ein Event an die Verbindung eines Benutzers, falls online
    pub fn an_nutzer_senden(&self, user_id: &UserId, event: ServerEvent) -> bool {
        match self.presence.nachschlagen(user_id) {
            Some(verbindung_id) => self.broadcaster.an_verbindung_senden(&verbindung_id, event),
            None => {
                tracing::debug!(user_id = %user_id, event = event.name(), "Empfaenger nicht online");
                false
            }
        }
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
