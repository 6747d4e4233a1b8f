//! Session-Handler – Anmelden, Abmelden, Aufraeumen beim Trennen

use chatly_core::{UserId, VerbindungsId};
use chatly_protocol::ServerFrame;

use crate::connection::VerbindungsZustand;
use crate::dispatcher::DispatcherContext;
use crate::server_state::RelayState;

/// Antwortwert jeder Logout-Bestaetigung
pub const LOGOUT_ACK: &str = "ok";

/// `userOnline` – bindet den Benutzer an diese Verbindung
///
/// Ein weiteres `userOnline` auf derselben Verbindung identifiziert sie neu;
/// der fruehere Benutzer bleibt registriert.
pub fn handle_user_online(user_id: UserId, ctx: &mut DispatcherContext, state: &RelayState) {
    state.presence.online_setzen(user_id.clone(), ctx.verbindung_id);
    tracing::debug!(
        verbindung = %ctx.verbindung_id,
        user_id = %user_id,
        "Verbindung identifiziert"
    );
    ctx.zustand = VerbindungsZustand::Identifiziert(user_id);
}

/// `userLogout` – entfernt den Benutzer, bestaetigt immer mit "ok"
pub fn handle_user_logout(
    user_id: UserId,
    ack: Option<u64>,
    ctx: &mut DispatcherContext,
    state: &RelayState,
) -> Option<ServerFrame> {
    let entfernt = state.presence.entfernen(&user_id);
    tracing::info!(user_id = %user_id, entfernt, "Logout");

    if ctx.zustand == VerbindungsZustand::Identifiziert(user_id) {
        ctx.zustand = VerbindungsZustand::Geschlossen;
    }

    ack.map(|id| ServerFrame::ack(id, LOGOUT_ACK))
}

/// Raeumt nach dem Trennen einer Verbindung auf
///
/// Zuerst wird die Send-Queue abgemeldet, danach verschwinden alle
/// Benutzer dieser Verbindung aus der Registry.
pub fn verbindung_aufraeumen(verbindung_id: &VerbindungsId, state: &RelayState) -> Vec<UserId> {
    state.broadcaster.verbindung_entfernen(verbindung_id);
    let entfernt = state.presence.per_verbindung_entfernen(verbindung_id);
    tracing::debug!(
        verbindung = %verbindung_id,
        benutzer = entfernt.len(),
        "Verbindung aufgeraeumt"
    );
    entfernt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::RelayConfig;
    use std::net::SocketAddr;

    fn kontext(verbindung_id: VerbindungsId) -> DispatcherContext {
        DispatcherContext::neu(verbindung_id, SocketAddr::from(([127, 0, 0, 1], 4000)))
    }

    #[test]
    fn online_identifiziert_verbindung() {
        let state = RelayState::neu(RelayConfig::default());
        let h = VerbindungsId::new();
        let mut ctx = kontext(h);

        handle_user_online(UserId::from(5), &mut ctx, &state);

        assert_eq!(ctx.zustand, VerbindungsZustand::Identifiziert(UserId::from(5)));
        assert_eq!(state.presence.nachschlagen(&UserId::from(5)), Some(h));
    }

    #[test]
    fn logout_bestaetigt_immer() {
        let state = RelayState::neu(RelayConfig::default());
        let mut ctx = kontext(VerbindungsId::new());

        let erste = handle_user_logout(UserId::from(42), Some(1), &mut ctx, &state);
        let zweite = handle_user_logout(UserId::from(42), Some(2), &mut ctx, &state);

        assert_eq!(erste, Some(ServerFrame::ack(1, "ok")));
        assert_eq!(zweite, Some(ServerFrame::ack(2, "ok")));
        assert!(handle_user_logout(UserId::from(42), None, &mut ctx, &state).is_none());
    }

    #[test]
    fn logout_schliesst_nur_eigene_identitaet() {
        let state = RelayState::neu(RelayConfig::default());
        let mut ctx = kontext(VerbindungsId::new());
        handle_user_online(UserId::from(1), &mut ctx, &state);

        handle_user_logout(UserId::from(2), None, &mut ctx, &state);
        assert_eq!(ctx.zustand, VerbindungsZustand::Identifiziert(UserId::from(1)));

        handle_user_logout(UserId::from(1), None, &mut ctx, &state);
        assert_eq!(ctx.zustand, VerbindungsZustand::Geschlossen);

        // Eine geschlossene Session darf sich erneut anmelden
        handle_user_online(UserId::from(1), &mut ctx, &state);
        assert_eq!(ctx.zustand, VerbindungsZustand::Identifiziert(UserId::from(1)));
    }

    #[test]
    fn aufraeumen_meldet_queue_und_benutzer_ab() {
        let state = RelayState::neu(RelayConfig::default());
        let h = VerbindungsId::new();
        let _rx = state.broadcaster.verbindung_registrieren(h, 8);
        let mut ctx = kontext(h);
        handle_user_online(UserId::from(9), &mut ctx, &state);

        let entfernt = verbindung_aufraeumen(&h, &state);

        assert_eq!(entfernt, vec![UserId::from(9)]);
        assert!(!state.broadcaster.ist_registriert(&h));
        assert_eq!(state.presence.nachschlagen(&UserId::from(9)), None);
    }
}
