//! History module - append-only record of fee changes.

use serde::{Deserialize, Serialize};

use crate::domain::fee::FeeSnapshot;
use crate::domain::foundation::{CommandMetadata, FeeId, HistoryEntryId, Timestamp};

/// What happened to the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Recalculated,
    Deleted,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Recalculated => "recalculated",
            HistoryAction::Deleted => "deleted",
        }
    }
}

/// One history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub fee_id: FeeId,
    pub action: HistoryAction,
    pub before: Option<FeeSnapshot>,
    pub after: Option<FeeSnapshot>,
    pub actor: String,
    pub reason: Option<String>,
    pub correlation_id: String,
    pub source: Option<String>,
    pub recorded_at: Timestamp,
}

impl HistoryEntry {
    pub fn new(
        fee_id: FeeId,
        action: HistoryAction,
        before: Option<FeeSnapshot>,
        after: Option<FeeSnapshot>,
        metadata: &CommandMetadata,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            id: HistoryEntryId::new(),
            fee_id,
            action,
            before,
            after,
            actor: metadata.actor.clone(),
            reason: metadata.reason().map(str::to_string),
            correlation_id: metadata.correlation_id(),
            source: metadata.source().map(str::to_string),
            recorded_at,
        }
    }
}
