//! Presence-Registry – Wer ist online, unter welcher Verbindung
//!
//! Haelt die Zuordnung Benutzer -> Verbindung plus einen Rueckwaerts-Index
//! Verbindung -> Benutzer fuer das Aufraeumen beim Trennen. Beide Maps
//! liegen hinter einem einzigen Lock; jede Aenderung verteilt die neue
//! Online-Liste noch unter diesem Lock, damit veroeffentlichte Snapshots
//! nie in anderer Reihenfolge ankommen als die Aenderungen selbst.
//!
//! Pro Benutzer gibt es hoechstens einen Eintrag. Ein spaeteres
//! `online_setzen` ueberschreibt die fruehere Verbindung.

use chatly_core::{UserId, VerbindungsId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::broadcast::EventBroadcaster;

/// Online-Registry aller identifizierten Benutzer
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct PresenceRegistry {
    inner: Arc<Mutex<PresenceInner>>,
    broadcaster: EventBroadcaster,
}

#[derive(Default)]
struct PresenceInner {
    /// Benutzer -> Verbindung
    nutzer: HashMap<UserId, VerbindungsId>,
    /// Verbindung -> Benutzer, die auf sie zeigen
    verbindungen: HashMap<VerbindungsId, HashSet<UserId>>,
}

impl PresenceInner {
    fn snapshot(&self) -> Vec<UserId> {
        let mut online: Vec<UserId> = self.nutzer.keys().cloned().collect();
        online.sort();
        online
    }

    fn index_entfernen(&mut self, user_id: &UserId, verbindung_id: &VerbindungsId) {
        if let Some(menge) = self.verbindungen.get_mut(verbindung_id) {
            menge.remove(user_id);
            if menge.is_empty() {
                self.verbindungen.remove(verbindung_id);
            }
        }
    }
}

impl PresenceRegistry {
    /// Erstellt eine leere Registry, die ueber `broadcaster` veroeffentlicht
    pub fn neu(broadcaster: EventBroadcaster) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PresenceInner::default())),
            broadcaster,
        }
    }

    /// Setzt einen Benutzer auf online (ueberschreibt eine fruehere Verbindung)
    pub fn online_setzen(&self, user_id: UserId, verbindung_id: VerbindungsId) {
        let mut inner = self.inner.lock();

        if let Some(alt) = inner.nutzer.insert(user_id.clone(), verbindung_id) {
            if alt != verbindung_id {
                inner.index_entfernen(&user_id, &alt);
                tracing::debug!(
                    user_id = %user_id,
                    alt = %alt,
                    neu = %verbindung_id,
                    "Benutzer hat neue Verbindung"
                );
            }
        }
        inner
            .verbindungen
            .entry(verbindung_id)
            .or_default()
            .insert(user_id.clone());

        tracing::info!(user_id = %user_id, verbindung = %verbindung_id, "Benutzer online");
        self.broadcaster.online_nutzer_veroeffentlichen(inner.snapshot());
    }

    /// Entfernt einen Benutzer; verteilt nur, wenn er online war
    pub fn entfernen(&self, user_id: &UserId) -> bool {
        let mut inner = self.inner.lock();

        let Some(verbindung_id) = inner.nutzer.remove(user_id) else {
            tracing::debug!(user_id = %user_id, "Entfernen: Benutzer war nicht online");
            return false;
        };
        inner.index_entfernen(user_id, &verbindung_id);

        tracing::info!(user_id = %user_id, "Benutzer offline");
        self.broadcaster.online_nutzer_veroeffentlichen(inner.snapshot());
        true
    }

    /// Entfernt alle Benutzer einer Verbindung
    ///
    /// Verteilt die Online-Liste immer, auch wenn niemand entfernt wurde.
    pub fn per_verbindung_entfernen(&self, verbindung_id: &VerbindungsId) -> Vec<UserId> {
        let mut inner = self.inner.lock();

        let mut entfernt: Vec<UserId> = inner
            .verbindungen
            .remove(verbindung_id)
            .map(|menge| menge.into_iter().collect())
            .unwrap_or_default();
        for user_id in &entfernt {
            inner.nutzer.remove(user_id);
        }
        entfernt.sort();

        if !entfernt.is_empty() {
            tracing::info!(
                verbindung = %verbindung_id,
                anzahl = entfernt.len(),
                "Benutzer der Verbindung offline"
            );
        }
        self.broadcaster.online_nutzer_veroeffentlichen(inner.snapshot());
        entfernt
    }

    /// Verbindung eines Benutzers, falls online
    pub fn nachschlagen(&self, user_id: &UserId) -> Option<VerbindungsId> {
        self.inner.lock().nutzer.get(user_id).copied()
    }

    /// Sortierte Liste aller Online-Benutzer
    pub fn online_nutzer(&self) -> Vec<UserId> {
        self.inner.lock().snapshot()
    }

    /// Anzahl der Online-Benutzer
    pub fn online_anzahl(&self) -> usize {
        self.inner.lock().nutzer.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chatly_protocol::{ServerEvent, ServerFrame};
    use tokio::sync::mpsc;

    fn registry() -> (PresenceRegistry, VerbindungsId, mpsc::Receiver<ServerFrame>) {
        let broadcaster = EventBroadcaster::neu();
        let beobachter = VerbindungsId::new();
        let rx = broadcaster.verbindung_registrieren(beobachter, 64);
        (PresenceRegistry::neu(broadcaster), beobachter, rx)
    }

    fn online_listen(rx: &mut mpsc::Receiver<ServerFrame>) -> Vec<Vec<UserId>> {
        let mut listen = Vec::new();
        while let Ok(rahmen) = rx.try_recv() {
            if let ServerFrame::Event(ServerEvent::OnlineUsers(liste)) = rahmen {
                listen.push(liste);
            }
        }
        listen
    }

    #[test]
    fn spaetere_verbindung_gewinnt() {
        let (presence, _, _rx) = registry();
        let h1 = VerbindungsId::new();
        let h2 = VerbindungsId::new();
        let u = UserId::from(7);

        presence.online_setzen(u.clone(), h1);
        presence.online_setzen(u.clone(), h2);

        assert_eq!(presence.nachschlagen(&u), Some(h2));
        assert_eq!(presence.online_anzahl(), 1);

        // Trennen der alten Verbindung darf den Benutzer nicht entfernen
        assert!(presence.per_verbindung_entfernen(&h1).is_empty());
        assert_eq!(presence.nachschlagen(&u), Some(h2));
    }

    #[test]
    fn entfernen_verteilt_nur_bei_aenderung() {
        let (presence, _, mut rx) = registry();
        let u = UserId::from(1);

        presence.online_setzen(u.clone(), VerbindungsId::new());
        assert!(presence.entfernen(&u));
        assert!(!presence.entfernen(&u));

        let listen = online_listen(&mut rx);
        assert_eq!(listen, vec![vec![UserId::from(1)], vec![]]);
        assert_eq!(presence.nachschlagen(&u), None);
    }

    #[test]
    fn trennen_entfernt_alle_benutzer_der_verbindung() {
        let (presence, _, _rx) = registry();
        let h = VerbindungsId::new();
        let andere = VerbindungsId::new();

        presence.online_setzen(UserId::from(1), h);
        presence.online_setzen(UserId::from(2), h);
        presence.online_setzen(UserId::from(3), andere);

        let entfernt = presence.per_verbindung_entfernen(&h);
        assert_eq!(entfernt, vec![UserId::from(1), UserId::from(2)]);
        assert_eq!(presence.nachschlagen(&UserId::from(1)), None);
        assert_eq!(presence.nachschlagen(&UserId::from(2)), None);
        assert_eq!(presence.online_nutzer(), vec![UserId::from(3)]);
    }

    #[test]
    fn trennen_verteilt_immer() {
        let (presence, _, mut rx) = registry();
        presence.per_verbindung_entfernen(&VerbindungsId::new());

        assert_eq!(online_listen(&mut rx), vec![Vec::<UserId>::new()]);
    }

    #[test]
    fn online_liste_ohne_duplikate() {
        let (presence, _, mut rx) = registry();
        let h = VerbindungsId::new();

        presence.online_setzen(UserId::from(2), h);
        presence.online_setzen(UserId::from("2"), h);
        presence.online_setzen(UserId::from("anna"), h);
        presence.online_setzen(UserId::from(1), VerbindungsId::new());

        let erwartet = vec![UserId::from(1), UserId::from(2), UserId::from("anna")];
        assert_eq!(presence.online_nutzer(), erwartet);
        assert_eq!(online_listen(&mut rx).last(), Some(&erwartet));
    }
}
