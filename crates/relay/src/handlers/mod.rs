//! Handler fuer alle eingehenden Client-Events
//!
//! Jeder Handler ist fuer eine Event-Familie zustaendig und hat Zugriff auf
//! den gemeinsamen RelayState. Alle Zustellungen sind fire-and-forget; die
//! Rueckgabewerte zaehlen nur die eingereihten Rahmen (fuer Logs und Tests).

pub mod direct_handler;
pub mod group_handler;
pub mod session_handler;
