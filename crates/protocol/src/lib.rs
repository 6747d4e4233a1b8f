//! chatly-protocol – Event-Definitionen und Wire-Format
//!
//! Dieses Crate definiert alle Events, die zwischen Client und Relay
//! ausgetauscht werden, sowie deren JSON-Rahmen auf dem WebSocket.
//!
//! ## Aufteilung
//! - [`eingang`] – Events vom Client (`userOnline`, `privateMessage`, ...)
//! - [`ausgang`] – Events an Clients (`onlineUsers`, `groupUpdate`, ...)
//! - [`wire`]    – Text-Rahmen: `{"event", "data", "ack"}`

pub mod ausgang;
pub mod eingang;
pub mod wire;

pub use ausgang::{ServerEvent, ServerFrame};
pub use eingang::ClientEvent;
pub use wire::{EingangsRahmen, ProtokollFehler};
