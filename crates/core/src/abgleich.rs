//! Abgleich-Hook zum externen Gruppen-Backend
//!
//! Gruppen und Mitgliedschaften gehoeren der externen API/Datenbank. Bevor
//! das Relay einen Gruppen-Austritt an alle Clients meldet, wartet es auf
//! diesen Hook. Schlaegt er fehl, bekommt nur der Ausloeser eine
//! Fehlermeldung; es gibt keine Wiederholung und kein Timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{GroupId, UserId};

/// Art des Austritts aus einer Gruppe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AustrittsArt {
    /// Benutzer hat die Gruppe selbst verlassen
    #[serde(rename = "left")]
    Verlassen,
    /// Benutzer wurde entfernt
    #[serde(rename = "removed")]
    Entfernt,
}

impl AustrittsArt {
    /// Aktionsname fuer Fehlermeldungen an den Client ("leave"/"remove")
    pub fn versuchte_aktion(&self) -> &'static str {
        match self {
            Self::Verlassen => "leave",
            Self::Entfernt => "remove",
        }
    }
}

/// Ein Gruppen-Austritt, wie er dem Backend gemeldet wird
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GruppenAustritt {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub art: AustrittsArt,
    /// Wer entfernt hat (nur bei `Entfernt` sinnvoll)
    pub removed_by_id: Option<UserId>,
    pub is_admin: bool,
}

impl GruppenAustritt {
    /// Der Benutzer, der die Aktion ausgeloest hat
    pub fn ausloeser(&self) -> &UserId {
        self.removed_by_id.as_ref().unwrap_or(&self.user_id)
    }
}

/// Schnittstelle zum externen Gruppen-Backend
#[async_trait]
pub trait GruppenAbgleich: Send + Sync + 'static {
    /// Verarbeitet einen Austritt; erst nach `Ok` wird er verteilt
    async fn austritt_verarbeiten(&self, austritt: &GruppenAustritt) -> crate::Result<()>;
}

/// Standard-Hook: Mitgliedschaften pflegt der Client selbst ueber die API
#[derive(Debug, Clone, Copy, Default)]
pub struct KeinAbgleich;

#[async_trait]
impl GruppenAbgleich for KeinAbgleich {
    async fn austritt_verarbeiten(&self, _austritt: &GruppenAustritt) -> crate::Result<()> {
        Ok(())
    }
}
