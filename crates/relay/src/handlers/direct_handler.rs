//! Direkt-Handler – Nachrichten zwischen zwei Teilnehmern
//!
//! Private Nachricht, Bearbeiten, Loeschen und Tipp-Indikator. Offline
//! Empfaenger werden nicht gepuffert.

use chatly_core::{ChatId, VerbindungsId};
use chatly_protocol::{
    ausgang::{
        zeitstempel_oder_jetzt, MessageDeleted, MessageUpdate, PrivateMessageEnvelope,
        TypingIndicator,
    },
    eingang::{DeleteMessageRequest, PrivateMessageRequest, TypingRequest, UpdateMessageRequest},
    ServerEvent,
};
use chrono::Utc;

use crate::server_state::RelayState;

/// `privateMessage` – an den Empfaenger (falls online) und als Echo an
/// die sendende Verbindung
pub fn handle_private_message(
    request: PrivateMessageRequest,
    verbindung_id: &VerbindungsId,
    state: &RelayState,
) -> usize {
    let umschlag = PrivateMessageEnvelope {
        timestamp: zeitstempel_oder_jetzt(request.timestamp, Utc::now()),
        sender_id: request.sender_id,
        receiver_id: request.receiver_id,
        message: request.message,
        message_id: request.message_id,
    };
    let receiver_id = umschlag.receiver_id.clone();
    tracing::debug!(
        sender_id = %umschlag.sender_id,
        receiver_id = %receiver_id,
        message_id = %umschlag.message_id,
        "Private Nachricht"
    );

    let event = ServerEvent::PrivateMessage(umschlag);
    let mut gesendet = usize::from(state.an_nutzer_senden(&receiver_id, event.clone()));
    if state.broadcaster.an_verbindung_senden(verbindung_id, event) {
        gesendet += 1;
    }
    gesendet
}

/// `updateMessage` – an Sender und Empfaenger
pub fn handle_update_message(request: UpdateMessageRequest, state: &RelayState) -> usize {
    let chat_id = request
        .chat_id
        .unwrap_or_else(|| ChatId::fuer_teilnehmer(&request.sender_id, &request.receiver_id));

    let event = ServerEvent::UpdateMessage(MessageUpdate {
        chat_id,
        message_id: request.message_id,
        message: request.message,
        updated_at: Utc::now(),
    });

    [&request.sender_id, &request.receiver_id]
        .into_iter()
        .filter(|user_id| state.an_nutzer_senden(user_id, event.clone()))
        .count()
}

/// `deleteMessage` – Soft-Delete-Markierung an Sender und Empfaenger
pub fn handle_delete_message(request: DeleteMessageRequest, state: &RelayState) -> usize {
    let chat_id = request
        .chat_id
        .unwrap_or_else(|| ChatId::fuer_teilnehmer(&request.sender_id, &request.receiver_id));

    let event = ServerEvent::DeleteMessage(MessageDeleted {
        chat_id,
        message_id: request.message_id,
        is_deleted: true,
        deleted_at: Utc::now(),
    });

    [&request.sender_id, &request.receiver_id]
        .into_iter()
        .filter(|user_id| state.an_nutzer_senden(user_id, event.clone()))
        .count()
}

/// `typing` – nur an den Empfaenger, nie als Echo
pub fn handle_typing(request: TypingRequest, state: &RelayState) -> usize {
    let event = ServerEvent::Typing(TypingIndicator {
        user_id: request.sender_id,
        typing: request.typing,
    });
    usize::from(state.an_nutzer_senden(&request.receiver_id, event))
}
