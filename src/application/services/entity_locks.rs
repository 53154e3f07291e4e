use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::value_objects::{EntityId, EntityKind};

type EntityKey = (EntityKind, EntityId);

#[derive(Default)]
struct LockTable {
    slots: HashMap<EntityKey, Arc<Mutex<()>>>,
    /// Local id -> server id for records whose CREATE was acknowledged.
    rekeyed: HashMap<EntityKey, EntityId>,
}

impl LockTable {
    fn resolve(&self, kind: EntityKind, mut id: EntityId) -> EntityId {
        while let Some(next) = self.rekeyed.get(&(kind, id.clone())) {
            id = next.clone();
        }
        id
    }

    fn slot(&mut self, kind: EntityKind, id: &EntityId) -> Arc<Mutex<()>> {
        // Slots nobody holds or waits for.
        self.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        self.slots
            .entry((kind, id.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Held while one record is read, changed and written back.
pub struct EntityGuard {
    id: EntityId,
    _slot: OwnedMutexGuard<()>,
}

impl EntityGuard {
    /// The id the record is stored under right now.
    pub fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Per-record locks shared by local writes and sync bookkeeping, so a confirmation never
/// writes back a snapshot older than a concurrent edit.
#[derive(Clone, Default)]
pub struct EntityLocks {
    table: Arc<Mutex<LockTable>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks exactly `id`.
    pub async fn lock(&self, kind: EntityKind, id: &EntityId) -> EntityGuard {
        let slot = self.table.lock().await.slot(kind, id);
        EntityGuard {
            id: id.clone(),
            _slot: slot.lock_owned().await,
        }
    }

    /// Locks the record `id` refers to, following rekeys to the server id, including one
    /// that lands while waiting.
    pub async fn lock_current(&self, kind: EntityKind, id: &EntityId) -> EntityGuard {
        let mut id = id.clone();
        loop {
            let slot = {
                let mut table = self.table.lock().await;
                id = table.resolve(kind, id);
                table.slot(kind, &id)
            };
            let guard = slot.lock_owned().await;
            let current = self.table.lock().await.resolve(kind, id.clone());
            if current == id {
                return EntityGuard { id, _slot: guard };
            }
            id = current;
        }
    }

    pub async fn record_rekey(&self, kind: EntityKind, old_id: &EntityId, new_id: &EntityId) {
        if old_id != new_id {
            self.table
                .lock()
                .await
                .rekeyed
                .insert((kind, old_id.clone()), new_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(value: &str) -> EntityId {
        EntityId::new(value).unwrap()
    }

    #[tokio::test]
    async fn same_record_is_serialized() {
        let locks = EntityLocks::new();
        let held = locks.lock(EntityKind::Dimension, &id("d1")).await;

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock(EntityKind::Dimension, &id("d1")).await.id().clone() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(held);
        assert_eq!(waiting.await.unwrap(), id("d1"));
    }

    #[tokio::test]
    async fn other_records_are_not_blocked() {
        let locks = EntityLocks::new();
        let _held = locks.lock(EntityKind::Dimension, &id("d1")).await;

        tokio::time::timeout(Duration::from_millis(100), async {
            locks.lock(EntityKind::Dimension, &id("d2")).await;
            locks.lock(EntityKind::Assessment, &id("d1")).await;
        })
        .await
        .expect("unrelated locks are free");
    }

    #[tokio::test]
    async fn waiters_follow_a_rekey_made_while_they_wait() {
        let locks = EntityLocks::new();
        let held = locks.lock(EntityKind::Dimension, &id("local-1")).await;

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .lock_current(EntityKind::Dimension, &id("local-1"))
                    .await
                    .id()
                    .clone()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        locks
            .record_rekey(EntityKind::Dimension, &id("local-1"), &id("srv-1"))
            .await;
        drop(held);

        assert_eq!(waiting.await.unwrap(), id("srv-1"));
        assert_eq!(
            locks
                .lock_current(EntityKind::Dimension, &id("local-1"))
                .await
                .id(),
            &id("srv-1")
        );
    }
}
