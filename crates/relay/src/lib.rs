//! chatly-relay – WebSocket-Relay fuer Chatly
//!
//! Dieser Crate verwaltet WebSocket-Verbindungen, die Online-Registry und
//! das Routing von Chat-Events zwischen verbundenen Clients. Er speichert
//! nichts; Nachrichten und Gruppen gehoeren dem externen Backend.
//!
//! ## Architektur
//!
//! ```text
//! Axum-Router (RelayServer)  GET /  |  GET /socket
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  State Machine: Verbunden -> Identifiziert -> Geschlossen
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- SessionHandler  (userOnline, userLogout, Aufraeumen)
//!     +-- DirectHandler   (privateMessage, update, delete, typing)
//!     +-- GroupHandler    (Gruppennachrichten, createGroup, Austritte)
//!
//! PresenceRegistry – Benutzer -> Verbindung, verteilt onlineUsers
//! EventBroadcaster – Send-Queue pro Verbindung
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod presence;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::{ClientConnection, VerbindungsZustand};
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{RelayError, RelayResult};
pub use presence::PresenceRegistry;
pub use server_state::{RelayConfig, RelayState};
pub use ws::RelayServer;
