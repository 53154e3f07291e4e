use crate::domain::value_objects::EntityKind;

pub(super) const RECORD_BASE_COLUMNS: [&str; 8] = [
    "id",
    "sync_status",
    "sync_retries",
    "last_error",
    "sync_failed",
    "ever_synced",
    "updated_at",
    "document",
];

pub(super) const QUEUE_COLUMNS: &str =
    "id, entity_type, entity_id, action, payload, timestamp, retries, last_error, parked";

pub(super) const INSERT_QUEUE_ITEM: &str = r#"
    INSERT INTO sync_queue (entity_type, entity_id, action, payload, timestamp, retries, last_error, parked)
    VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, 0)
"#;

pub(super) const SELECT_QUEUE_ITEM: &str = r#"
    SELECT id, entity_type, entity_id, action, payload, timestamp, retries, last_error, parked
    FROM sync_queue
    WHERE id = ?1
"#;

pub(super) const SELECT_PENDING_ITEMS: &str = r#"
    SELECT q.id, q.entity_type, q.entity_id, q.action, q.payload, q.timestamp, q.retries,
           q.last_error, q.parked
    FROM sync_queue q
    WHERE q.parked = 0
      AND NOT EXISTS (
          SELECT 1 FROM sync_queue p
          WHERE p.parked = 1
            AND p.entity_type = q.entity_type
            AND p.entity_id = q.entity_id
            AND p.id < q.id
      )
    ORDER BY q.id ASC
    LIMIT ?1
"#;

pub(super) const SELECT_ITEMS_FOR_ENTITY: &str = r#"
    SELECT id, entity_type, entity_id, action, payload, timestamp, retries, last_error, parked
    FROM sync_queue
    WHERE entity_type = ?1 AND entity_id = ?2
    ORDER BY id ASC
"#;

pub(super) const DELETE_QUEUE_ITEM: &str = r#"
    DELETE FROM sync_queue WHERE id = ?1
"#;

pub(super) const DELETE_ITEMS_FOR_ENTITY: &str = r#"
    DELETE FROM sync_queue WHERE entity_type = ?1 AND entity_id = ?2
"#;

pub(super) const RECORD_ITEM_FAILURE: &str = r#"
    UPDATE sync_queue
    SET retries = retries + 1, last_error = ?2
    WHERE id = ?1
    RETURNING retries
"#;

pub(super) const PARK_ITEM: &str = r#"
    UPDATE sync_queue SET parked = 1 WHERE id = ?1
"#;

pub(super) const UNPARK_ITEMS_FOR_ENTITY: &str = r#"
    UPDATE sync_queue
    SET parked = 0, retries = 0, last_error = NULL
    WHERE entity_type = ?1 AND entity_id = ?2 AND parked = 1
"#;

pub(super) const RETARGET_ITEMS: &str = r#"
    UPDATE sync_queue
    SET entity_id = ?3,
        payload = json_set(payload, '$.id', ?3)
    WHERE entity_type = ?1 AND entity_id = ?2
"#;

pub(super) const COUNT_QUEUE_ITEMS: &str = r#"
    SELECT COUNT(*) FROM sync_queue
"#;

pub(super) fn record_columns(kind: EntityKind) -> Vec<&'static str> {
    RECORD_BASE_COLUMNS
        .iter()
        .copied()
        .chain(kind.index_columns().iter().map(|column| column.name))
        .collect()
}

pub(super) fn select_records(kind: EntityKind) -> String {
    format!(
        "SELECT {} FROM {}",
        record_columns(kind).join(", "),
        kind.table()
    )
}

/// Upsert of a full row. Pulled rows (`from_remote`) only overwrite an existing row that
/// is SYNCED and actually differs, so an unchanged pull is a no-op.
pub(super) fn upsert_record(kind: EntityKind, from_remote: bool) -> String {
    let columns = record_columns(kind);
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("?{n}")).collect();
    let assignments: Vec<String> = columns
        .iter()
        .skip(1)
        .map(|column| format!("{column} = excluded.{column}"))
        .collect();
    let table = kind.table();

    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        columns.join(", "),
        placeholders.join(", "),
        assignments.join(", ")
    );
    if from_remote {
        sql.push_str(&format!(
            " WHERE {table}.sync_status = 'synced' AND {table}.document IS NOT excluded.document"
        ));
    }
    sql
}

pub(super) fn delete_record(kind: EntityKind) -> String {
    format!("DELETE FROM {} WHERE id = ?1", kind.table())
}

pub(super) fn delete_unsynced_record(kind: EntityKind) -> String {
    format!(
        "DELETE FROM {} WHERE id = ?1 AND ever_synced = 0",
        kind.table()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_lists_index_columns_after_base_columns() {
        let sql = upsert_record(EntityKind::DimensionAssessment, false);
        assert!(sql.starts_with(
            "INSERT INTO dimension_assessments (id, sync_status, sync_retries, last_error, \
             sync_failed, ever_synced, updated_at, document, dimension_id, assessment_id) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn pulled_upserts_are_guarded() {
        let sql = upsert_record(EntityKind::Dimension, true);
        assert!(sql.ends_with(
            "WHERE dimensions.sync_status = 'synced' AND dimensions.document IS NOT excluded.document"
        ));
    }
}
