//! Gemeinsame Identifikationstypen fuer Chatly
//!
//! Benutzer-, Gruppen-, Chat- und Nachrichten-IDs stammen aus der externen
//! Datenbank und sind fuer das Relay opak: Clients schicken sie mal als
//! Zahl, mal als String. `Kennung` normalisiert beide Formen, sodass `42`
//! und `"42"` denselben Benutzer bezeichnen. Jede ID-Art bekommt trotzdem
//! ihren eigenen Newtype, um Verwechslungen zur Compilezeit auszuschliessen.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Kennung
// ---------------------------------------------------------------------------

/// Opake Kennung (numerisch oder Text)
///
/// Numerische Strings in kanonischer Form werden beim Einlesen zu `Zahl`.
/// Serialisiert wird `Zahl` als JSON-Zahl, `Text` als JSON-String.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kennung {
    Zahl(i64),
    Text(String),
}

impl Kennung {
    /// Liest eine Kennung aus Text; `"42"` wird zu `Zahl(42)`, `"042"` bleibt Text
    pub fn aus_text(text: &str) -> Self {
        match text.parse::<i64>() {
            Ok(n) if n.to_string() == text => Self::Zahl(n),
            _ => Self::Text(text.to_string()),
        }
    }
}

impl fmt::Display for Kennung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zahl(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

impl From<i64> for Kennung {
    fn from(n: i64) -> Self {
        Self::Zahl(n)
    }
}

impl From<&str> for Kennung {
    fn from(text: &str) -> Self {
        Self::aus_text(text)
    }
}

impl Serialize for Kennung {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Zahl(n) => serializer.serialize_i64(*n),
            Self::Text(t) => serializer.serialize_str(t),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RohKennung {
    Zahl(i64),
    GrosseZahl(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for Kennung {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RohKennung::deserialize(deserializer)? {
            RohKennung::Zahl(n) => Self::Zahl(n),
            // jenseits von i64: wie die gleichlautende String-Form behandeln
            RohKennung::GrosseZahl(n) => Self::Text(n.to_string()),
            RohKennung::Text(t) => Self::aus_text(&t),
        })
    }
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! kennung_typ {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Kennung);

        impl $name {
            /// Gibt die innere Kennung zurueck
            pub fn inner(&self) -> &Kennung {
                &self.0
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(Kennung::Zahl(n))
            }
        }

        impl From<&str> for $name {
            fn from(text: &str) -> Self {
                Self(Kennung::aus_text(text))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

kennung_typ!(
    /// Benutzer-ID (vergeben von der externen Datenbank)
    UserId
);
kennung_typ!(
    /// Gruppen-ID
    GroupId
);
kennung_typ!(
    /// ID eines Zweier-Chats
    ChatId
);
kennung_typ!(
    /// Nachrichten-ID
    MessageId
);

impl ChatId {
    /// Leitet die Chat-ID zweier Teilnehmer ab: `"<a>_<b>"`, Textformen
    /// aufsteigend sortiert, unabhaengig von der Reihenfolge der Argumente.
    pub fn fuer_teilnehmer(a: &UserId, b: &UserId) -> Self {
        let mut teile = [a.to_string(), b.to_string()];
        teile.sort();
        Self(Kennung::Text(format!("{}_{}", teile[0], teile[1])))
    }
}

// ---------------------------------------------------------------------------
// VerbindungsId
// ---------------------------------------------------------------------------

/// ID einer einzelnen Transport-Verbindung (eine pro WebSocket)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zahl_und_numerischer_string_sind_gleich() {
        let a: UserId = serde_json::from_str("42").unwrap();
        let b: UserId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, UserId::from(42));
    }

    #[test]
    fn nicht_kanonische_zahl_bleibt_text() {
        let id: UserId = serde_json::from_str("\"042\"").unwrap();
        assert_eq!(id.inner(), &Kennung::Text("042".into()));
        assert_ne!(id, UserId::from(42));
    }

    #[test]
    fn numerische_ids_werden_als_zahl_ausgegeben() {
        let ids = vec![UserId::from("7"), UserId::from("abc")];
        let json = serde_json::to_string(&ids).unwrap();
        assert_eq!(json, r#"[7,"abc"]"#);
    }

    #[test]
    fn zahl_ueber_i64_wird_angenommen() {
        let id: UserId = serde_json::from_str("9223372036854775808").unwrap();
        let als_text: UserId = serde_json::from_str("\"9223372036854775808\"").unwrap();
        assert_eq!(id, als_text);
        assert_eq!(id.to_string(), "9223372036854775808");
    }

    #[test]
    fn gebrochene_zahl_wird_abgelehnt() {
        assert!(serde_json::from_str::<UserId>("4.5").is_err());
        assert!(serde_json::from_str::<UserId>("null").is_err());
    }

    #[test]
    fn chat_id_ist_reihenfolgeunabhaengig() {
        let a = UserId::from(3);
        let b = UserId::from(12);
        assert_eq!(ChatId::fuer_teilnehmer(&a, &b), ChatId::fuer_teilnehmer(&b, &a));
        // Textsortierung: "12" < "3"
        assert_eq!(ChatId::fuer_teilnehmer(&a, &b).to_string(), "12_3");
    }

    #[test]
    fn verbindungs_id_eindeutig() {
        assert_ne!(VerbindungsId::new(), VerbindungsId::new());
    }
}
