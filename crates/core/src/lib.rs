//! chatly-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Chatly-Crates gemeinsam genutzt werden: die opaken Kennungen
//! fuer Benutzer, Gruppen, Chats und Nachrichten, die Verbindungs-ID des
//! Transports und den Abgleich-Hook zum externen Gruppen-Backend.

pub mod abgleich;
pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use abgleich::{AustrittsArt, GruppenAbgleich, GruppenAustritt, KeinAbgleich};
pub use error::{ChatlyError, Result};
pub use types::{ChatId, GroupId, Kennung, MessageId, UserId, VerbindungsId};
