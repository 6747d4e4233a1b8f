//! Message-Dispatcher – Routet Client-Events an die richtigen Handler
//!
//! Der Dispatcher empfaengt dekodierte Events einer ClientConnection,
//! bestimmt den Handler und gibt einen eventuellen Antwort-Rahmen zurueck.
//! Antworten gibt es nur fuer `userLogout` mit `ack`-ID; alles andere ist
//! fire-and-forget.
//!
//! Es gibt keine Zustandspruefung: Chat-Events einer noch anonymen
//! Verbindung finden ihre Empfaenger ueber die Registry wie alle anderen.

use chatly_core::{AustrittsArt, UserId, VerbindungsId};
use chatly_protocol::{wire, ClientEvent, ServerFrame};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::connection::VerbindungsZustand;
use crate::error::RelayResult;
use crate::handlers::{direct_handler, group_handler, session_handler};
use crate::server_state::RelayState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    /// Handle dieser Verbindung in Broadcaster und Registry
    pub verbindung_id: VerbindungsId,
    /// Peer-Adresse (nur fuer Logs)
    pub peer_addr: SocketAddr,
    /// Aktueller Session-Zustand
    pub zustand: VerbindungsZustand,
}

impl DispatcherContext {
    /// Kontext einer frisch aufgebauten, anonymen Verbindung
    pub fn neu(verbindung_id: VerbindungsId, peer_addr: SocketAddr) -> Self {
        Self {
            verbindung_id,
            peer_addr,
            zustand: VerbindungsZustand::Verbunden,
        }
    }

    /// Benutzer, als der die Verbindung identifiziert ist
    pub fn user_id(&self) -> Option<&UserId> {
        match &self.zustand {
            VerbindungsZustand::Identifiziert(user_id) => Some(user_id),
            _ => None,
        }
    }
}

/// Zentraler Message-Dispatcher
#[derive(Clone)]
pub struct MessageDispatcher {
    state: Arc<RelayState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<RelayState>) -> Self {
        Self { state }
    }

    /// Dekodiert einen Text-Rahmen und verarbeitet das Event
    ///
    /// Kaputte Rahmen kommen als `RelayError::Protokoll` zurueck; der
    /// Aufrufer verwirft sie.
    pub async fn text_verarbeiten(
        &self,
        text: &str,
        ctx: &mut DispatcherContext,
    ) -> RelayResult<Option<ServerFrame>> {
        let (event, ack) = wire::dekodieren(text)?;
        Ok(self.dispatch(event, ack, ctx).await)
    }

    /// Verarbeitet ein eingehendes Event und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll.
    pub async fn dispatch(
        &self,
        event: ClientEvent,
        ack: Option<u64>,
        ctx: &mut DispatcherContext,
    ) -> Option<ServerFrame> {
        let state = self.state.as_ref();
        tracing::trace!(
            verbindung = %ctx.verbindung_id,
            event = event.name(),
            ack = ?ack,
            "Event empfangen"
        );

        match event {
            // -------------------------------------------------------------------
            // Session
            // -------------------------------------------------------------------
            ClientEvent::UserOnline(user_id) => {
                session_handler::handle_user_online(user_id, ctx, state);
                None
            }

            ClientEvent::UserLogout(user_id) => {
                session_handler::handle_user_logout(user_id, ack, ctx, state)
            }

            // -------------------------------------------------------------------
            // Direktnachrichten
            // -------------------------------------------------------------------
            ClientEvent::PrivateMessage(req) => {
                direct_handler::handle_private_message(req, &ctx.verbindung_id, state);
                None
            }

            ClientEvent::UpdateMessage(req) => {
                direct_handler::handle_update_message(req, state);
                None
            }

            ClientEvent::DeleteMessage(req) => {
                direct_handler::handle_delete_message(req, state);
                None
            }

            ClientEvent::Typing(req) => {
                direct_handler::handle_typing(req, state);
                None
            }

            // -------------------------------------------------------------------
            // Gruppen
            // -------------------------------------------------------------------
            ClientEvent::CreateGroup(req) => {
                group_handler::handle_create_group(req, state);
                None
            }

            ClientEvent::GroupMessage(req) => {
                group_handler::handle_group_message(req, state);
                None
            }

            ClientEvent::GroupTyping(req) => {
                group_handler::handle_group_typing(req, state);
                None
            }

            ClientEvent::UpdateGroupMessage(req) => {
                group_handler::handle_update_group_message(req, state);
                None
            }

            ClientEvent::DeleteGroupMessage(req) => {
                group_handler::handle_delete_group_message(req, state);
                None
            }

            ClientEvent::DeleteAllGroupMessages(req) => {
                group_handler::handle_delete_all_group_messages(req, state);
                None
            }

            ClientEvent::GroupUpdate(req) => {
                group_handler::handle_group_update(req, state).await;
                None
            }

            ClientEvent::LeaveGroup(req) => {
                group_handler::handle_group_exit(req, AustrittsArt::Verlassen, state).await;
                None
            }

            ClientEvent::RemoveGroupUser(req) => {
                group_handler::handle_group_exit(req, AustrittsArt::Entfernt, state).await;
                None
            }
        }
    }

    /// Raeumt nach dem Ende einer Verbindung auf
    pub fn verbindung_beendet(&self, ctx: &mut DispatcherContext) -> Vec<UserId> {
        ctx.zustand = VerbindungsZustand::Geschlossen;
        session_handler::verbindung_aufraeumen(&ctx.verbindung_id, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::server_state::RelayConfig;

    fn aufbau() -> (MessageDispatcher, DispatcherContext, Arc<RelayState>) {
        let state = RelayState::neu(RelayConfig::default());
        let ctx = DispatcherContext::neu(
            VerbindungsId::new(),
            SocketAddr::from(([127, 0, 0, 1], 5555)),
        );
        (MessageDispatcher::neu(Arc::clone(&state)), ctx, state)
    }

    #[tokio::test]
    async fn logout_mit_ack() {
        let (dispatcher, mut ctx, _) = aufbau();
        let antwort = dispatcher
            .text_verarbeiten(r#"{"event":"userLogout","data":42,"ack":3}"#, &mut ctx)
            .await
            .unwrap();
        assert_eq!(antwort, Some(ServerFrame::ack(3, "ok")));
    }

    #[tokio::test]
    async fn andere_events_werden_nicht_bestaetigt() {
        let (dispatcher, mut ctx, state) = aufbau();
        let antwort = dispatcher
            .text_verarbeiten(r#"{"event":"userOnline","data":"7","ack":1}"#, &mut ctx)
            .await
            .unwrap();
        assert!(antwort.is_none());
        assert_eq!(ctx.user_id(), Some(&UserId::from(7)));
        assert_eq!(state.presence.nachschlagen(&UserId::from(7)), Some(ctx.verbindung_id));
    }

    #[tokio::test]
    async fn kaputter_rahmen_ist_protokollfehler() {
        let (dispatcher, mut ctx, _) = aufbau();
        let fehler = dispatcher
            .text_verarbeiten(r#"{"event":"typing","data":{"typing":true}}"#, &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(fehler, RelayError::Protokoll(_)));
        assert!(fehler.ist_verwerfbar());
        assert_eq!(ctx.zustand, VerbindungsZustand::Verbunden);
    }

    #[tokio::test]
    async fn verbindungsende_raeumt_auf() {
        let (dispatcher, mut ctx, state) = aufbau();
        let _rx = state.broadcaster.verbindung_registrieren(ctx.verbindung_id, 8);
        dispatcher
            .dispatch(ClientEvent::UserOnline(UserId::from(1)), None, &mut ctx)
            .await;

        assert_eq!(dispatcher.verbindung_beendet(&mut ctx), vec![UserId::from(1)]);
        assert_eq!(ctx.zustand, VerbindungsZustand::Geschlossen);
        assert_eq!(state.presence.online_anzahl(), 0);
    }
}
