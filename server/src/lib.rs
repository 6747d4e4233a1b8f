//! chatly-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use chatly_relay::{RelayServer, RelayState};
use config::ServerConfig;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet das Relay und laeuft bis Ctrl-C
    ///
    /// Das Shutdown-Signal geht ueber einen watch-Kanal an den Listener und
    /// an jede offene Verbindung.
    pub async fn starten(self) -> Result<()> {
        let bind_addr = self.config.bind_adresse()?;
        let state = RelayState::neu(self.config.relay_config());

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            origins = ?self.config.cors.origins,
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut relay = tokio::spawn(RelayServer::neu(state, bind_addr).starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
            ergebnis = &mut relay => {
                ergebnis??;
                return Ok(());
            }
        }

        relay.await??;
        tracing::info!("Server beendet");
        Ok(())
    }
}
