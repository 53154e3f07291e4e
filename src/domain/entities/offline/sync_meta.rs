use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{SyncEvent, SyncState, SyncStatus};
use crate::shared::error::AppError;

/// Sync bookkeeping embedded in every synchronizable record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncMeta {
    pub state: SyncState,
    pub ever_synced: bool,
    pub retries: u32,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SyncMeta {
    pub fn new_local(now: DateTime<Utc>) -> Self {
        Self {
            state: SyncState::New,
            ever_synced: false,
            retries: 0,
            last_error: None,
            updated_at: now,
        }
    }

    /// Bookkeeping for a record that came straight from the server.
    pub fn synced(now: DateTime<Utc>) -> Self {
        Self {
            state: SyncState::Synced,
            ever_synced: true,
            retries: 0,
            last_error: None,
            updated_at: now,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.state.status()
    }

    pub fn apply(&mut self, event: SyncEvent, now: DateTime<Utc>) -> Result<(), AppError> {
        let next = self.state.transition(event.clone(), self.ever_synced)?;
        match &event {
            SyncEvent::PushSucceeded => {
                self.ever_synced = true;
                self.retries = 0;
                self.last_error = None;
            }
            SyncEvent::PushExhausted { reason, retries } => {
                self.retries = *retries;
                self.last_error = Some(reason.clone());
            }
            SyncEvent::LocalEdit | SyncEvent::Retry { .. } => {
                self.retries = 0;
                self.last_error = None;
            }
            SyncEvent::LocalDelete => {}
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// Transient push failure: keeps the state, records why the retry is pending.
    pub fn note_failure(&mut self, retries: u32, error: impl Into<String>) {
        self.retries = retries;
        self.last_error = Some(error.into());
    }

    /// Persisted form of the bookkeeping.
    pub fn columns(&self) -> SyncColumns {
        match &self.state {
            SyncState::Failed { reason, retries } => SyncColumns {
                status: SyncStatus::Failed,
                retries: *retries,
                last_error: Some(reason.clone()),
                failed: true,
            },
            SyncState::FailedTombstone { reason, retries } => SyncColumns {
                status: SyncStatus::Deleted,
                retries: *retries,
                last_error: Some(reason.clone()),
                failed: true,
            },
            state => SyncColumns {
                status: state.status(),
                retries: self.retries,
                last_error: self.last_error.clone(),
                failed: false,
            },
        }
    }

    pub fn from_columns(
        columns: SyncColumns,
        ever_synced: bool,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let SyncColumns {
            status,
            retries,
            last_error,
            failed,
        } = columns;
        let state = match status {
            SyncStatus::New => SyncState::New,
            SyncStatus::Pending => SyncState::Dirty,
            SyncStatus::Synced => SyncState::Synced,
            SyncStatus::Failed => SyncState::Failed {
                reason: last_error.clone().unwrap_or_default(),
                retries,
            },
            SyncStatus::Deleted if failed => SyncState::FailedTombstone {
                reason: last_error.clone().unwrap_or_default(),
                retries,
            },
            SyncStatus::Deleted => SyncState::TombstonePending,
        };
        Self {
            state,
            ever_synced,
            retries,
            last_error,
            updated_at,
        }
    }
}

/// `sync_status`, `sync_retries`, `last_error` and `sync_failed` as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncColumns {
    pub status: SyncStatus,
    pub retries: u32,
    pub last_error: Option<String>,
    pub failed: bool,
}
