//! Ausgehende Events (Relay -> Client)
//!
//! Die Event-Namen spiegeln die eingehenden Namen. Jeder Umschlag wird pro
//! Empfaenger einmal in dessen Send-Queue gelegt und danach verworfen.

use chatly_core::{AustrittsArt, ChatId, GroupId, MessageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::eingang::CreateGroupRequest;

/// Fehlertext fuer gescheiterte Gruppen-Austritte
pub const GRUPPEN_UPDATE_FEHLER: &str = "Failed to process group update";

/// Ersetzt einen fehlenden oder "leeren" Client-Zeitstempel durch jetzt
///
/// Als leer gelten `null`, `false`, `0` und `""`.
pub fn zeitstempel_oder_jetzt(zeitstempel: Option<Value>, jetzt: DateTime<Utc>) -> Value {
    match zeitstempel {
        Some(Value::String(s)) if !s.is_empty() => Value::String(s),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Value::Number(n),
        Some(Value::Bool(true)) => Value::Bool(true),
        Some(v @ (Value::Array(_) | Value::Object(_))) => v,
        _ => Value::String(jetzt.to_rfc3339()),
    }
}

// ---------------------------------------------------------------------------
// Direktnachrichten
// ---------------------------------------------------------------------------

/// Umschlag einer privaten Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageEnvelope {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub message_id: MessageId,
    pub timestamp: Value,
}

/// Bearbeitete Direktnachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdate {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

/// Soft-Delete-Markierung einer Direktnachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub is_deleted: bool,
    pub deleted_at: DateTime<Utc>,
}

/// Tipp-Indikator (nur an den Empfaenger)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub user_id: UserId,
    pub typing: bool,
}

// ---------------------------------------------------------------------------
// Gruppen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageEnvelope {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub message: String,
    pub message_id: MessageId,
    pub timestamp: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTypingIndicator {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageUpdate {
    pub group_id: GroupId,
    pub message_id: MessageId,
    pub message: String,
    pub updated_at: DateTime<Utc>,
    pub sender_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageDeleted {
    pub group_id: GroupId,
    pub message_id: MessageId,
    pub is_deleted: bool,
    pub deleted_at: DateTime<Utc>,
}

/// Markierung "alle Nachrichten geloescht" (geht nur an den Ausloeser)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessagesCleared {
    pub group_id: GroupId,
    pub delete_all: bool,
    pub deleted_at: DateTime<Utc>,
}

/// Mitgliedschafts-Aenderung, geht an alle Verbindungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdateNotice {
    pub group_id: GroupId,
    pub action: AustrittsArt,
    pub user_id: UserId,
    pub removed_by_id: Option<UserId>,
    pub is_admin: bool,
    pub timestamp: DateTime<Utc>,
}

/// Fehlermeldung an den Ausloeser eines gescheiterten Austritts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdateFailure {
    pub group_id: GroupId,
    pub error: String,
    /// "leave" oder "remove"
    pub action: String,
}

// ---------------------------------------------------------------------------
// ServerEvent / ServerFrame
// ---------------------------------------------------------------------------

/// Alle Events, die das Relay an Clients sendet
///
/// Auf dem Wire: `{"event": "<name>", "data": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    OnlineUsers(Vec<UserId>),
    PrivateMessage(PrivateMessageEnvelope),
    UpdateMessage(MessageUpdate),
    DeleteMessage(MessageDeleted),
    Typing(TypingIndicator),
    CreateGroup(CreateGroupRequest),
    GroupMessage(GroupMessageEnvelope),
    GroupTyping(GroupTypingIndicator),
    UpdateGroupMessage(GroupMessageUpdate),
    DeleteGroupMessage(GroupMessageDeleted),
    DeleteAllGroupMessages(GroupMessagesCleared),
    GroupUpdate(GroupUpdateNotice),
    GroupUpdateError(GroupUpdateFailure),
}

impl ServerEvent {
    /// Event-Name auf dem Wire (fuer Logs)
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => "onlineUsers",
            Self::PrivateMessage(_) => "privateMessage",
            Self::UpdateMessage(_) => "updateMessage",
            Self::DeleteMessage(_) => "deleteMessage",
            Self::Typing(_) => "typing",
            Self::CreateGroup(_) => "createGroup",
            Self::GroupMessage(_) => "groupMessage",
            Self::GroupTyping(_) => "groupTyping",
            Self::UpdateGroupMessage(_) => "updateGroupMessage",
            Self::DeleteGroupMessage(_) => "deleteGroupMessage",
            Self::DeleteAllGroupMessages(_) => "deleteAllGroupMessages",
            Self::GroupUpdate(_) => "groupUpdate",
            Self::GroupUpdateError(_) => "groupUpdateError",
        }
    }
}

/// Bestaetigung eines eingehenden Rahmens mit `ack`-ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckFrame {
    pub ack: u64,
    pub data: Value,
}

/// Ein Rahmen in der Send-Queue einer Verbindung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Event(ServerEvent),
    Ack(AckFrame),
}

impl ServerFrame {
    /// Erstellt eine Bestaetigung mit beliebigem Wert
    pub fn ack(id: u64, data: impl Into<Value>) -> Self {
        Self::Ack(AckFrame {
            ack: id,
            data: data.into(),
        })
    }
}

impl From<ServerEvent> for ServerFrame {
    fn from(event: ServerEvent) -> Self {
        Self::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn online_users_wire_format() {
        let event = ServerEvent::OnlineUsers(vec![UserId::from(1), UserId::from("ab")]);
        let json = serde_json::to_value(ServerFrame::from(event)).unwrap();
        assert_eq!(json, json!({ "event": "onlineUsers", "data": [1, "ab"] }));
    }

    #[test]
    fn ack_wire_format() {
        let json = serde_json::to_value(ServerFrame::ack(7, "ok")).unwrap();
        assert_eq!(json, json!({ "ack": 7, "data": "ok" }));
    }

    #[test]
    fn typing_nutzt_camel_case() {
        let event = ServerEvent::Typing(TypingIndicator {
            user_id: UserId::from(5),
            typing: true,
        });
        assert_eq!(event.name(), "typing");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({ "event": "typing", "data": { "userId": 5, "typing": true } }));
    }

    #[test]
    fn rahmen_lassen_sich_wieder_lesen() {
        let frame: ServerFrame =
            serde_json::from_value(json!({ "event": "onlineUsers", "data": [3] })).unwrap();
        assert_eq!(
            frame,
            ServerFrame::Event(ServerEvent::OnlineUsers(vec![UserId::from(3)]))
        );
        let frame: ServerFrame = serde_json::from_value(json!({ "ack": 1, "data": "ok" })).unwrap();
        assert_eq!(frame, ServerFrame::ack(1, "ok"));
    }

    #[test]
    fn leerer_zeitstempel_wird_ersetzt() {
        let jetzt = Utc::now();
        let erwartet = Value::String(jetzt.to_rfc3339());
        assert_eq!(zeitstempel_oder_jetzt(None, jetzt), erwartet);
        assert_eq!(zeitstempel_oder_jetzt(Some(json!("")), jetzt), erwartet);
        assert_eq!(zeitstempel_oder_jetzt(Some(json!(0)), jetzt), erwartet);
        assert_eq!(zeitstempel_oder_jetzt(Some(Value::Null), jetzt), erwartet);
    }

    #[test]
    fn gesetzter_zeitstempel_bleibt() {
        let jetzt = Utc::now();
        assert_eq!(
            zeitstempel_oder_jetzt(Some(json!("2024-01-01T00:00:00Z")), jetzt),
            json!("2024-01-01T00:00:00Z")
        );
        assert_eq!(
            zeitstempel_oder_jetzt(Some(json!(1700000000000_i64)), jetzt),
            json!(1700000000000_i64)
        );
    }

    #[test]
    fn gruppen_update_fehler_format() {
        let event = ServerEvent::GroupUpdateError(GroupUpdateFailure {
            group_id: GroupId::from(4),
            error: GRUPPEN_UPDATE_FEHLER.to_string(),
            action: AustrittsArt::Verlassen.versuchte_aktion().to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "groupUpdateError");
        assert_eq!(json["data"]["action"], "leave");
        assert_eq!(json["data"]["groupId"], 4);
    }
}
