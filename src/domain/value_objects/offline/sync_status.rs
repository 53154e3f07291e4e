use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::error::AppError;

/// Coarse status persisted in `sync_status` and shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    New,
    Pending,
    Synced,
    Failed,
    Deleted,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::New => "new",
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "new" => Ok(SyncStatus::New),
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            "deleted" => Ok(SyncStatus::Deleted),
            other => Err(format!("Unknown sync status: {other}")),
        }
    }

    /// Records in this status belong to the push path and are never overwritten by a pull.
    pub fn is_locally_owned(&self) -> bool {
        !matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a synchronizable record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Created locally, never acknowledged by the server.
    #[default]
    New,
    /// Local edit of a record the server already knows.
    Dirty,
    Synced,
    Failed { reason: String, retries: u32 },
    /// Deleted locally, remote delete not yet confirmed.
    TombstonePending,
    /// Deleted locally and the remote delete ran out of retries. Still hidden; only an
    /// explicit retry re-arms the DELETE.
    FailedTombstone { reason: String, retries: u32 },
    /// Remote delete confirmed; the row is purged right after.
    TombstoneSynced,
}

/// Something that happened to a record, fed into [`SyncState::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    LocalEdit,
    LocalDelete,
    PushSucceeded,
    PushExhausted { reason: String, retries: u32 },
    Retry { deleting: bool },
}

impl SyncState {
    pub fn status(&self) -> SyncStatus {
        match self {
            SyncState::New => SyncStatus::New,
            SyncState::Dirty => SyncStatus::Pending,
            SyncState::Synced => SyncStatus::Synced,
            SyncState::Failed { .. } => SyncStatus::Failed,
            SyncState::TombstonePending
            | SyncState::FailedTombstone { .. }
            | SyncState::TombstoneSynced => SyncStatus::Deleted,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(
            self,
            SyncState::TombstonePending
                | SyncState::FailedTombstone { .. }
                | SyncState::TombstoneSynced
        )
    }

    /// `Failed` or `FailedTombstone`: waiting for an explicit retry.
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncState::Failed { .. } | SyncState::FailedTombstone { .. })
    }

    pub fn transition(&self, event: SyncEvent, ever_synced: bool) -> Result<SyncState, AppError> {
        use SyncState::*;

        let next = match (self, &event) {
            (TombstoneSynced, _) => None,

            (New, SyncEvent::LocalEdit) => Some(New),
            (Dirty | Synced, SyncEvent::LocalEdit) => Some(Dirty),
            (Failed { .. }, SyncEvent::LocalEdit) => Some(if ever_synced { Dirty } else { New }),
            (TombstonePending | FailedTombstone { .. }, SyncEvent::LocalEdit) => None,

            (FailedTombstone { .. }, SyncEvent::LocalDelete) => Some(self.clone()),
            (_, SyncEvent::LocalDelete) => Some(TombstonePending),

            (TombstonePending | FailedTombstone { .. }, SyncEvent::PushSucceeded) => {
                Some(TombstoneSynced)
            }
            (_, SyncEvent::PushSucceeded) => Some(Synced),

            (
                TombstonePending | FailedTombstone { .. },
                SyncEvent::PushExhausted { reason, retries },
            ) => Some(FailedTombstone {
                reason: reason.clone(),
                retries: *retries,
            }),
            (_, SyncEvent::PushExhausted { reason, retries }) => Some(Failed {
                reason: reason.clone(),
                retries: *retries,
            }),

            (FailedTombstone { .. }, SyncEvent::Retry { .. }) => Some(TombstonePending),
            (Failed { .. }, SyncEvent::Retry { deleting: true }) => Some(TombstonePending),
            (Failed { .. }, SyncEvent::Retry { deleting: false }) => {
                Some(if ever_synced { Dirty } else { New })
            }
            (state, SyncEvent::Retry { .. }) => Some(state.clone()),
        };

        next.ok_or_else(|| {
            AppError::LocalIntegrity(format!(
                "illegal sync transition from {} on {:?}",
                self.status(),
                event
            ))
        })
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Failed { reason, retries } => {
                write!(f, "failed after {retries} retries: {reason}")
            }
            SyncState::FailedTombstone { reason, retries } => {
                write!(f, "delete failed after {retries} retries: {reason}")
            }
            other => f.write_str(other.status().as_str()),
        }
    }
}
