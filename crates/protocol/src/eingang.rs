//! Eingehende Events (Client -> Relay)
//!
//! Jedes Event hat einen festen Namen und einen strukturierten Payload.
//! Die Payload-Felder folgen der camelCase-Konvention des Web-Clients.
//! Pflichtfelder werden streng geprueft; optionale Felder (`timestamp`,
//! `chatId`, `removedById`, `isAdmin`) fallen auf Standardwerte zurueck.

use chatly_core::{AustrittsArt, ChatId, GroupId, MessageId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wire::ProtokollFehler;

// ---------------------------------------------------------------------------
// Gemeinsame Bausteine
// ---------------------------------------------------------------------------

/// Ein Eintrag der vom Client mitgeschickten Mitgliederliste
///
/// Zusaetzliche Felder (Name, Avatar, ...) bleiben erhalten, damit
/// `createGroup` die Gruppendetails unveraendert weiterreichen kann.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub user_id: UserId,
    #[serde(flatten)]
    pub weitere: Map<String, Value>,
}

impl GroupMember {
    pub fn neu(user_id: UserId) -> Self {
        Self {
            user_id,
            weitere: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Direktnachrichten
// ---------------------------------------------------------------------------

/// `privateMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageRequest {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub message_id: MessageId,
    /// Vom Client gesetzter Zeitstempel, wird unveraendert weitergereicht
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// `updateMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageRequest {
    /// Fehlt die Chat-ID, wird sie aus Sender und Empfaenger abgeleitet
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message_id: MessageId,
    pub message: String,
}

/// `deleteMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
}

/// `typing`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub typing: bool,
}

// ---------------------------------------------------------------------------
// Gruppen
// ---------------------------------------------------------------------------

/// `createGroup` – die Gruppendetails gehen vollstaendig an alle Mitglieder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub group_users: Vec<GroupMember>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// `groupMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageRequest {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub message: String,
    pub message_id: MessageId,
    #[serde(default)]
    pub timestamp: Option<Value>,
    pub group_users: Vec<GroupMember>,
}

/// `groupTyping`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTypingRequest {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub typing: bool,
    pub group_users: Vec<GroupMember>,
}

/// `updateGroupMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupMessageRequest {
    pub group_id: GroupId,
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub message: String,
    pub group_users: Vec<GroupMember>,
}

/// `deleteGroupMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGroupMessageRequest {
    pub group_id: GroupId,
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub group_users: Vec<GroupMember>,
}

/// `deleteAllGroupMessages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllGroupMessagesRequest {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub group_users: Vec<GroupMember>,
}

/// `groupUpdate` – nur die Aktionen `left` und `removed` werden verarbeitet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdateRequest {
    pub group_id: GroupId,
    #[serde(default)]
    pub action: Option<String>,
    pub user_id: UserId,
    #[serde(default)]
    pub removed_by_id: Option<UserId>,
    #[serde(default)]
    pub is_admin: bool,
}

impl GroupUpdateRequest {
    /// Liefert die Austrittsart, falls die Aktion eine ist
    pub fn austritts_art(&self) -> Option<AustrittsArt> {
        match self.action.as_deref() {
            Some("left") => Some(AustrittsArt::Verlassen),
            Some("removed") => Some(AustrittsArt::Entfernt),
            _ => None,
        }
    }
}

/// `leaveGroup` / `removeGroupUser` – Aliase mit fest vorgegebener Aktion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExitRequest {
    pub group_id: GroupId,
    pub user_id: UserId,
    #[serde(default)]
    pub removed_by_id: Option<UserId>,
    #[serde(default)]
    pub is_admin: bool,
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Alle Events, die ein Client senden darf
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    UserOnline(UserId),
    UserLogout(UserId),
    PrivateMessage(PrivateMessageRequest),
    UpdateMessage(UpdateMessageRequest),
    DeleteMessage(DeleteMessageRequest),
    Typing(TypingRequest),
    CreateGroup(CreateGroupRequest),
    GroupMessage(GroupMessageRequest),
    GroupTyping(GroupTypingRequest),
    UpdateGroupMessage(UpdateGroupMessageRequest),
    DeleteGroupMessage(DeleteGroupMessageRequest),
    DeleteAllGroupMessages(DeleteAllGroupMessagesRequest),
    GroupUpdate(GroupUpdateRequest),
    LeaveGroup(GroupExitRequest),
    RemoveGroupUser(GroupExitRequest),
}

impl ClientEvent {
    /// Dekodiert den Payload eines Events anhand seines Namens
    pub fn dekodieren(name: &str, data: Value) -> Result<Self, ProtokollFehler> {
        fn payload<T: serde::de::DeserializeOwned>(
            name: &str,
            data: Value,
        ) -> Result<T, ProtokollFehler> {
            serde_json::from_value(data).map_err(|quelle| ProtokollFehler::UngueltigerPayload {
                event: name.to_string(),
                quelle,
            })
        }

        let event = match name {
            "userOnline" => Self::UserOnline(payload(name, data)?),
            "userLogout" => Self::UserLogout(payload(name, data)?),
            "privateMessage" => Self::PrivateMessage(payload(name, data)?),
            "updateMessage" => Self::UpdateMessage(payload(name, data)?),
            "deleteMessage" => Self::DeleteMessage(payload(name, data)?),
            "typing" => Self::Typing(payload(name, data)?),
            "createGroup" => Self::CreateGroup(payload(name, data)?),
            "groupMessage" => Self::GroupMessage(payload(name, data)?),
            "groupTyping" => Self::GroupTyping(payload(name, data)?),
            "updateGroupMessage" => Self::UpdateGroupMessage(payload(name, data)?),
            "deleteGroupMessage" => Self::DeleteGroupMessage(payload(name, data)?),
            "deleteAllGroupMessages" => Self::DeleteAllGroupMessages(payload(name, data)?),
            "groupUpdate" => Self::GroupUpdate(payload(name, data)?),
            "leaveGroup" => Self::LeaveGroup(payload(name, data)?),
            "removeGroupUser" => Self::RemoveGroupUser(payload(name, data)?),
            unbekannt => return Err(ProtokollFehler::UnbekanntesEvent(unbekannt.to_string())),
        };
        Ok(event)
    }

    /// Event-Name auf dem Wire (fuer Logs)
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserOnline(_) => "userOnline",
            Self::UserLogout(_) => "userLogout",
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
            Self::LeaveGroup(_) => "leaveGroup",
            Self::RemoveGroupUser(_) => "removeGroupUser",
        }
    }
}
