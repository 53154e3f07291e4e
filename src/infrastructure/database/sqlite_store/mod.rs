use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashSet;

use super::ConnectionPool;
use crate::application::ports::local_store::{LocalStore, ReconcileOutcome, RecordFilter};
use crate::domain::entities::{NewSyncQueueItem, StoredRecord, SyncQueueItem};
use crate::domain::value_objects::{EntityId, EntityKind, SyncQueueId, SyncStatus};
use crate::shared::error::AppError;

mod mapper;
mod queries;

use mapper::{bind_record, map_queue_row, map_record_row};

/// Upper bound of bound parameters per `IN (...)` list.
const ID_CHUNK: usize = 500;

pub struct SqliteLocalStore {
    pool: ConnectionPool,
}

impl SqliteLocalStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        self.pool.migrate().await?;
        Ok(())
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

fn checked_column(kind: EntityKind, column: &str) -> Result<(), AppError> {
    if column == "id" || column == "updated_at" || kind.index_column(column).is_some() {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{column} is not a queryable column of {kind}"
        )))
    }
}

fn push_filter(
    builder: &mut QueryBuilder<'_, Sqlite>,
    kind: EntityKind,
    filter: &RecordFilter,
) -> Result<(), AppError> {
    builder.push(" WHERE 1 = 1");
    for (column, value) in &filter.equals {
        checked_column(kind, column)?;
        builder.push(format!(" AND {column} = "));
        builder.push_bind(value.clone());
    }
    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            builder.push(" AND 0");
        } else {
            builder.push(" AND sync_status IN (");
            let mut separated = builder.separated(", ");
            for status in statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
    }
    if filter.exclude_deleted {
        builder.push(" AND sync_status != 'deleted'");
    }
    Ok(())
}

async fn fetch_record(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<Option<StoredRecord>, AppError> {
    let sql = format!("{} WHERE id = ?1", queries::select_records(kind));
    let row = sqlx::query(&sql)
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(|row| map_record_row(kind, &row)).transpose()
}

async fn upsert_record(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    record: &StoredRecord,
    from_remote: bool,
) -> Result<u64, AppError> {
    let sql = queries::upsert_record(kind, from_remote);
    let result = bind_record(sqlx::query(&sql), kind, record)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn delete_record(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<bool, AppError> {
    let result = sqlx::query(&queries::delete_record(kind))
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn delete_records(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    ids: &[EntityId],
) -> Result<u64, AppError> {
    let mut removed = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "DELETE FROM {} WHERE id IN (",
            kind.table()
        ));
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_str().to_string());
        }
        separated.push_unseparated(")");
        removed += builder.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(removed)
}

async fn locally_owned_ids(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    ids: &[&EntityId],
) -> Result<HashSet<EntityId>, AppError> {
    let mut owned = HashSet::new();
    for chunk in ids.chunks(ID_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT id FROM {} WHERE sync_status != 'synced' AND id IN (",
            kind.table()
        ));
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_str().to_string());
        }
        separated.push_unseparated(")");
        let rows: Vec<(String,)> = builder.build_query_as().fetch_all(&mut *conn).await?;
        for (id,) in rows {
            owned.insert(EntityId::new(id).map_err(AppError::LocalIntegrity)?);
        }
    }
    Ok(owned)
}

async fn insert_queue_item(
    conn: &mut SqliteConnection,
    item: &NewSyncQueueItem,
) -> Result<SyncQueueItem, AppError> {
    let result = sqlx::query(queries::INSERT_QUEUE_ITEM)
        .bind(item.entity_type.as_str())
        .bind(item.entity_id.as_str())
        .bind(item.action.as_str())
        .bind(item.payload.to_json_string())
        .bind(item.timestamp.timestamp_millis())
        .execute(&mut *conn)
        .await?;
    let id = SyncQueueId::new(result.last_insert_rowid()).map_err(AppError::Database)?;
    Ok(SyncQueueItem {
        id,
        entity_type: item.entity_type,
        entity_id: item.entity_id.clone(),
        action: item.action,
        payload: item.payload.clone(),
        timestamp: item.timestamp,
        retries: 0,
        last_error: None,
        parked: false,
    })
}

async fn delete_queue_item(conn: &mut SqliteConnection, id: SyncQueueId) -> Result<(), AppError> {
    sqlx::query(queries::DELETE_QUEUE_ITEM)
        .bind(id.value())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn delete_items_for(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<u64, AppError> {
    let result = sqlx::query(queries::DELETE_ITEMS_FOR_ENTITY)
        .bind(kind.as_str())
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn unpark_items(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<u64, AppError> {
    let result = sqlx::query(queries::UNPARK_ITEMS_FOR_ENTITY)
        .bind(kind.as_str())
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn retarget(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    old_id: &EntityId,
    new_id: &EntityId,
) -> Result<u64, AppError> {
    let result = sqlx::query(queries::RETARGET_ITEMS)
        .bind(kind.as_str())
        .bind(old_id.as_str())
        .bind(new_id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<StoredRecord>, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        fetch_record(&mut conn, kind, id).await
    }

    async fn put(&self, kind: EntityKind, record: &StoredRecord) -> Result<(), AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        upsert_record(&mut conn, kind, record, false).await?;
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<bool, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        delete_record(&mut conn, kind, id).await
    }

    async fn bulk_put(&self, kind: EntityKind, records: &[StoredRecord]) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        for record in records {
            upsert_record(&mut tx, kind, record, false).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn bulk_delete(&self, kind: EntityKind, ids: &[EntityId]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.get_pool().begin().await?;
        let removed = delete_records(&mut tx, kind, ids).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn query(
        &self,
        kind: EntityKind,
        filter: &RecordFilter,
    ) -> Result<Vec<StoredRecord>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new(queries::select_records(kind));
        push_filter(&mut builder, kind, filter)?;
        match &filter.order_by {
            Some(column) => {
                checked_column(kind, column)?;
                builder.push(format!(" ORDER BY {column} ASC, rowid ASC"));
            }
            None => {
                builder.push(" ORDER BY rowid ASC");
            }
        }

        let mut conn = self.pool.get_pool().acquire().await?;
        let rows = builder.build().fetch_all(&mut *conn).await?;
        rows.iter().map(|row| map_record_row(kind, row)).collect()
    }

    async fn put_and_enqueue(
        &self,
        kind: EntityKind,
        record: &StoredRecord,
        item: NewSyncQueueItem,
    ) -> Result<SyncQueueItem, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        upsert_record(&mut tx, kind, record, false).await?;
        unpark_items(&mut tx, kind, &record.id).await?;
        let item = insert_queue_item(&mut tx, &item).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn rekey(
        &self,
        kind: EntityKind,
        old_id: &EntityId,
        record: &StoredRecord,
        completed: Option<SyncQueueId>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        if let Some(item) = completed {
            delete_queue_item(&mut tx, item).await?;
        }
        if old_id != &record.id {
            delete_record(&mut tx, kind, old_id).await?;
            retarget(&mut tx, kind, old_id, &record.id).await?;
        }
        upsert_record(&mut tx, kind, record, false).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn purge(
        &self,
        kind: EntityKind,
        id: &EntityId,
        completed: Option<SyncQueueId>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        if let Some(item) = completed {
            delete_queue_item(&mut tx, item).await?;
        }
        let removed = delete_record(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn apply_remote(
        &self,
        kind: EntityKind,
        scope: Option<&RecordFilter>,
        remote: &[StoredRecord],
        remote_ids: &HashSet<EntityId>,
    ) -> Result<ReconcileOutcome, AppError> {
        let mut outcome = ReconcileOutcome::default();
        let mut tx = self.pool.get_pool().begin().await?;

        let candidates: Vec<&EntityId> = remote.iter().map(|record| &record.id).collect();
        let owned = locally_owned_ids(&mut tx, kind, &candidates).await?;

        if let Some(scope) = scope {
            let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {}", kind.table()));
            let synced_scope = scope.clone().with_statuses(&[SyncStatus::Synced]);
            push_filter(&mut builder, kind, &synced_scope)?;
            let rows: Vec<(String,)> = builder.build_query_as().fetch_all(&mut *tx).await?;

            let stale: Vec<EntityId> = rows
                .into_iter()
                .filter_map(|(id,)| EntityId::new(id).ok())
                .filter(|id| !remote_ids.contains(id))
                .collect();
            if !stale.is_empty() {
                delete_records(&mut tx, kind, &stale).await?;
            }
            outcome.removed = stale;
        }

        for record in remote {
            if owned.contains(&record.id) {
                outcome.skipped.push(record.id.clone());
                continue;
            }
            if upsert_record(&mut tx, kind, record, true).await? > 0 {
                outcome.upserted.push(record.id.clone());
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn discard_unsynced(&self, kind: EntityKind, id: &EntityId) -> Result<bool, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        let result = sqlx::query(&queries::delete_unsynced_record(kind))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        delete_items_for(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn enqueue(&self, item: NewSyncQueueItem) -> Result<SyncQueueItem, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        insert_queue_item(&mut conn, &item).await
    }

    async fn queue_item(&self, id: SyncQueueId) -> Result<Option<SyncQueueItem>, AppError> {
        let row = sqlx::query(queries::SELECT_QUEUE_ITEM)
            .bind(id.value())
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(|row| map_queue_row(&row)).transpose()
    }

    async fn pending_items(&self, limit: u32) -> Result<Vec<SyncQueueItem>, AppError> {
        let rows = sqlx::query(queries::SELECT_PENDING_ITEMS)
            .bind(i64::from(limit))
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.iter().map(map_queue_row).collect()
    }

    async fn items_for(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Vec<SyncQueueItem>, AppError> {
        let rows = sqlx::query(queries::SELECT_ITEMS_FOR_ENTITY)
            .bind(kind.as_str())
            .bind(id.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.iter().map(map_queue_row).collect()
    }

    async fn remove_item(&self, id: SyncQueueId) -> Result<(), AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        delete_queue_item(&mut conn, id).await
    }

    async fn remove_items_for(&self, kind: EntityKind, id: &EntityId) -> Result<u64, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        delete_items_for(&mut conn, kind, id).await
    }

    async fn record_item_failure(&self, id: SyncQueueId, error: &str) -> Result<u32, AppError> {
        let retries: Option<(i64,)> = sqlx::query_as(queries::RECORD_ITEM_FAILURE)
            .bind(id.value())
            .bind(error)
            .fetch_optional(self.pool.get_pool())
            .await?;
        match retries {
            Some((retries,)) => Ok(retries.max(0) as u32),
            None => Err(AppError::LocalIntegrity(format!(
                "queue item {id} vanished before its failure was recorded"
            ))),
        }
    }

    async fn park_item(&self, id: SyncQueueId) -> Result<(), AppError> {
        sqlx::query(queries::PARK_ITEM)
            .bind(id.value())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn unpark_items_for(&self, kind: EntityKind, id: &EntityId) -> Result<u64, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        unpark_items(&mut conn, kind, id).await
    }

    async fn retarget_items(
        &self,
        kind: EntityKind,
        old_id: &EntityId,
        new_id: &EntityId,
    ) -> Result<u64, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        retarget(&mut conn, kind, old_id, new_id).await
    }

    async fn queue_len(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as(queries::COUNT_QUEUE_ITEMS)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as u64)
    }
}
