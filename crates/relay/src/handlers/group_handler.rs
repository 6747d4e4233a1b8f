//! Gruppen-Handler – Fan-out ueber die mitgeschickte Mitgliederliste
//!
//! Das Relay kennt keine Gruppen; jedes Event bringt seine Mitglieder selbst
//! mit. Zugestellt wird an jedes Mitglied, das gerade online ist.
//!
//! Ausnahmen:
//! - `groupTyping` geht nicht an den Sender
//! - `deleteAllGroupMessages` geht nur an den Sender selbst
//! - Austritte (`groupUpdate`, `leaveGroup`, `removeGroupUser`) gehen nach
//!   erfolgreichem Abgleich an alle Verbindungen

use chatly_core::{AustrittsArt, GruppenAustritt, UserId};
use chatly_protocol::{
    ausgang::{
        zeitstempel_oder_jetzt, GroupMessageDeleted, GroupMessageEnvelope, GroupMessageUpdate,
        GroupMessagesCleared, GroupTypingIndicator, GroupUpdateFailure, GroupUpdateNotice,
        GRUPPEN_UPDATE_FEHLER,
    },
    eingang::{
        CreateGroupRequest, DeleteAllGroupMessagesRequest, DeleteGroupMessageRequest,
        GroupExitRequest, GroupMember, GroupMessageRequest, GroupTypingRequest,
        GroupUpdateRequest, UpdateGroupMessageRequest,
    },
    ServerEvent,
};
use chrono::Utc;

use crate::server_state::RelayState;

/// Sendet ein Event an alle Online-Mitglieder, optional ohne einen Benutzer
fn an_mitglieder_senden(
    mitglieder: &[GroupMember],
    ausser: Option<&UserId>,
    event: &ServerEvent,
    state: &RelayState,
) -> usize {
    mitglieder
        .iter()
        .filter(|mitglied| Some(&mitglied.user_id) != ausser)
        .filter(|mitglied| state.an_nutzer_senden(&mitglied.user_id, event.clone()))
        .count()
}

/// `groupMessage` – an jedes Online-Mitglied (inklusive Sender)
pub fn handle_group_message(request: GroupMessageRequest, state: &RelayState) -> usize {
    let event = ServerEvent::GroupMessage(GroupMessageEnvelope {
        timestamp: zeitstempel_oder_jetzt(request.timestamp, Utc::now()),
        group_id: request.group_id.clone(),
        sender_id: request.sender_id,
        message: request.message,
        message_id: request.message_id,
    });

    let gesendet = an_mitglieder_senden(&request.group_users, None, &event, state);
    tracing::debug!(
        group_id = %request.group_id,
        mitglieder = request.group_users.len(),
        zugestellt = gesendet,
        "Gruppennachricht verteilt"
    );
    gesendet
}

/// `groupTyping` – an alle Mitglieder ausser dem Sender
pub fn handle_group_typing(request: GroupTypingRequest, state: &RelayState) -> usize {
    let event = ServerEvent::GroupTyping(GroupTypingIndicator {
        group_id: request.group_id,
        sender_id: request.sender_id.clone(),
        typing: request.typing,
    });
    an_mitglieder_senden(&request.group_users, Some(&request.sender_id), &event, state)
}

/// `updateGroupMessage`
pub fn handle_update_group_message(
    request: UpdateGroupMessageRequest,
    state: &RelayState,
) -> usize {
    let event = ServerEvent::UpdateGroupMessage(GroupMessageUpdate {
        group_id: request.group_id,
        message_id: request.message_id,
        message: request.message,
        updated_at: Utc::now(),
        sender_id: request.sender_id,
    });
    an_mitglieder_senden(&request.group_users, None, &event, state)
}

/// `deleteGroupMessage`
pub fn handle_delete_group_message(
    request: DeleteGroupMessageRequest,
    state: &RelayState,
) -> usize {
    let event = ServerEvent::DeleteGroupMessage(GroupMessageDeleted {
        group_id: request.group_id,
        message_id: request.message_id,
        is_deleted: true,
        deleted_at: Utc::now(),
    });
    an_mitglieder_senden(&request.group_users, None, &event, state)
}

/// `deleteAllGroupMessages` – nur an den Sender, sofern er in der Liste steht
///
/// Die uebrigen Mitglieder erfahren davon nichts; ihre Clients laden den
/// Verlauf beim naechsten Oeffnen neu.
pub fn handle_delete_all_group_messages(
    request: DeleteAllGroupMessagesRequest,
    state: &RelayState,
) -> usize {
    let event = ServerEvent::DeleteAllGroupMessages(GroupMessagesCleared {
        group_id: request.group_id,
        delete_all: true,
        deleted_at: Utc::now(),
    });
    request
        .group_users
        .iter()
        .filter(|mitglied| mitglied.user_id == request.sender_id)
        .filter(|mitglied| state.an_nutzer_senden(&mitglied.user_id, event.clone()))
        .count()
}

/// `createGroup` – Gruppendetails unveraendert an alle Mitglieder
pub fn handle_create_group(request: CreateGroupRequest, state: &RelayState) -> usize {
    let mitglieder = request.group_users.clone();
    let event = ServerEvent::CreateGroup(request);
    let gesendet = an_mitglieder_senden(&mitglieder, None, &event, state);
    tracing::debug!(mitglieder = mitglieder.len(), zugestellt = gesendet, "Gruppe angelegt");
    gesendet
}

// ---------------------------------------------------------------------------
// Austritte
// ---------------------------------------------------------------------------

/// `groupUpdate` – nur `left` und `removed` werden verarbeitet
pub async fn handle_group_update(request: GroupUpdateRequest, state: &RelayState) -> usize {
    let Some(art) = request.austritts_art() else {
        tracing::debug!(
            group_id = %request.group_id,
            action = ?request.action,
            "groupUpdate mit unbehandelter Aktion ignoriert"
        );
        return 0;
    };

    handle_gruppen_austritt(
        GruppenAustritt {
            group_id: request.group_id,
            user_id: request.user_id,
            art,
            removed_by_id: request.removed_by_id,
            is_admin: request.is_admin,
        },
        state,
    )
    .await
}

/// `leaveGroup` / `removeGroupUser` – Austritt mit fester Art
pub async fn handle_group_exit(
    request: GroupExitRequest,
    art: AustrittsArt,
    state: &RelayState,
) -> usize {
    handle_gruppen_austritt(
        GruppenAustritt {
            group_id: request.group_id,
            user_id: request.user_id,
            art,
            removed_by_id: request.removed_by_id,
            is_admin: request.is_admin,
        },
        state,
    )
    .await
}

/// Gleicht einen Austritt mit dem Backend ab und verteilt ihn an alle
///
/// Scheitert der Abgleich, bekommt nur der Ausloeser `groupUpdateError`.
/// Es gibt keine Wiederholung.
pub async fn handle_gruppen_austritt(austritt: GruppenAustritt, state: &RelayState) -> usize {
    if let Err(e) = state.gruppen_abgleich.austritt_verarbeiten(&austritt).await {
        tracing::error!(
            group_id = %austritt.group_id,
            user_id = %austritt.user_id,
            aktion = austritt.art.versuchte_aktion(),
            wiederholbar = e.ist_wiederholbar(),
            fehler = %e,
            "Gruppen-Austritt fehlgeschlagen"
        );
        let fehler = ServerEvent::GroupUpdateError(GroupUpdateFailure {
            group_id: austritt.group_id.clone(),
            error: GRUPPEN_UPDATE_FEHLER.to_string(),
            action: austritt.art.versuchte_aktion().to_string(),
        });
        state.an_nutzer_senden(austritt.ausloeser(), fehler);
        return 0;
    }

    let gesendet = state
        .broadcaster
        .an_alle_senden(ServerEvent::GroupUpdate(GroupUpdateNotice {
            group_id: austritt.group_id.clone(),
            action: austritt.art,
            user_id: austritt.user_id.clone(),
            removed_by_id: austritt.removed_by_id.clone(),
            is_admin: austritt.is_admin,
            timestamp: Utc::now(),
        }));
    tracing::info!(
        group_id = %austritt.group_id,
        user_id = %austritt.user_id,
        aktion = austritt.art.versuchte_aktion(),
        empfaenger = gesendet,
        "Gruppen-Austritt verteilt"
    );
    gesendet
}
