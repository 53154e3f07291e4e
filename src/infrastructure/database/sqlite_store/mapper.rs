use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{query::Query, Row, Sqlite};

use crate::domain::entities::{IndexValue, StoredRecord, SyncColumns, SyncMeta, SyncQueueItem};
use crate::domain::value_objects::{
    EntityId, EntityKind, OfflinePayload, SyncAction, SyncQueueId, SyncStatus,
};
use crate::shared::error::AppError;

pub(super) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub(super) fn map_record_row(kind: EntityKind, row: &SqliteRow) -> Result<StoredRecord, AppError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("sync_status")?;
    let retries: i64 = row.try_get("sync_retries")?;
    let last_error: Option<String> = row.try_get("last_error")?;
    let failed: bool = row.try_get("sync_failed")?;
    let ever_synced: bool = row.try_get("ever_synced")?;
    let updated_at: i64 = row.try_get("updated_at")?;
    let document: String = row.try_get("document")?;

    let status = SyncStatus::parse(&status).map_err(AppError::LocalIntegrity)?;
    let mut index = Vec::with_capacity(kind.index_columns().len());
    for column in kind.index_columns() {
        let value = if column.integer {
            row.try_get::<Option<i64>, _>(column.name)?
                .map(IndexValue::Integer)
        } else {
            row.try_get::<Option<String>, _>(column.name)?
                .map(IndexValue::Text)
        };
        index.push((column.name, value.unwrap_or(IndexValue::Null)));
    }

    Ok(StoredRecord {
        id: EntityId::new(id).map_err(AppError::LocalIntegrity)?,
        meta: SyncMeta::from_columns(
            SyncColumns {
                status,
                retries: retries.max(0) as u32,
                last_error,
                failed,
            },
            ever_synced,
            timestamp(updated_at),
        ),
        document: serde_json::from_str(&document)?,
        index,
    })
}

pub(super) fn bind_record<'q>(
    query: SqliteQuery<'q>,
    kind: EntityKind,
    record: &StoredRecord,
) -> SqliteQuery<'q> {
    let columns = record.meta.columns();
    let mut query = query
        .bind(record.id.as_str().to_string())
        .bind(columns.status.as_str())
        .bind(columns.retries as i64)
        .bind(columns.last_error)
        .bind(columns.failed)
        .bind(record.meta.ever_synced)
        .bind(record.meta.updated_at.timestamp_millis())
        .bind(record.document.to_string());

    for column in kind.index_columns() {
        let value = record
            .index
            .iter()
            .find(|(name, _)| *name == column.name)
            .map(|(_, value)| value.clone())
            .unwrap_or(IndexValue::Null);
        query = match value {
            IndexValue::Text(text) => query.bind(Some(text)),
            IndexValue::Integer(number) => query.bind(Some(number)),
            IndexValue::Null if column.integer => query.bind(None::<i64>),
            IndexValue::Null => query.bind(None::<String>),
        };
    }
    query
}

pub(super) fn map_queue_row(row: &SqliteRow) -> Result<SyncQueueItem, AppError> {
    let id: i64 = row.try_get("id")?;
    let entity_type: String = row.try_get("entity_type")?;
    let entity_id: String = row.try_get("entity_id")?;
    let action: String = row.try_get("action")?;
    let payload: String = row.try_get("payload")?;
    let created: i64 = row.try_get("timestamp")?;
    let retries: i64 = row.try_get("retries")?;
    let last_error: Option<String> = row.try_get("last_error")?;
    let parked: bool = row.try_get("parked")?;

    Ok(SyncQueueItem {
        id: SyncQueueId::new(id).map_err(AppError::LocalIntegrity)?,
        entity_type: entity_type
            .parse::<EntityKind>()
            .map_err(AppError::LocalIntegrity)?,
        entity_id: EntityId::new(entity_id).map_err(AppError::LocalIntegrity)?,
        action: SyncAction::parse(&action).map_err(AppError::LocalIntegrity)?,
        payload: OfflinePayload::from_json_str(&payload).map_err(AppError::Serialization)?,
        timestamp: timestamp(created),
        retries: retries.max(0) as u32,
        last_error,
        parked,
    })
}
