use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use assessment_sync::application::ports::{CollectionScope, RemoteApi, RemoteError};
use assessment_sync::EntityKind;
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create(EntityKind),
    Update(EntityKind, String),
    Delete(EntityKind, String),
    Get(EntityKind, String),
    List(EntityKind),
    ListSummaries(EntityKind),
}

impl RemoteCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            RemoteCall::Create(_) | RemoteCall::Update(_, _) | RemoteCall::Delete(_, _)
        )
    }
}

#[derive(Default)]
struct FakeState {
    collections: HashMap<EntityKind, BTreeMap<String, Value>>,
    next_id: u64,
    reachable: bool,
    write_failure: Option<RemoteError>,
    calls: Vec<RemoteCall>,
}

/// In-memory backend: assigns `srv-N` ids on create and serves what it stores.
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                reachable: true,
                ..FakeState::default()
            }),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    /// Every create/update/delete fails with `error` until cleared with `None`.
    pub fn fail_writes_with(&self, error: Option<RemoteError>) {
        self.state.lock().unwrap().write_failure = error;
    }

    pub fn seed(&self, kind: EntityKind, record: Value) {
        let id = record["id"].as_str().expect("seeded record id").to_string();
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(kind)
            .or_default()
            .insert(id, record);
    }

    pub fn remove(&self, kind: EntityKind, id: &str) {
        if let Some(records) = self.state.lock().unwrap().collections.get_mut(&kind) {
            records.remove(id);
        }
    }

    pub fn record(&self, kind: EntityKind, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&kind)
            .and_then(|records| records.get(id).cloned())
    }

    pub fn records(&self, kind: EntityKind) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&kind)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn write_calls(&self) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(RemoteCall::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn begin(&self, call: RemoteCall) -> Result<std::sync::MutexGuard<'_, FakeState>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if !state.reachable {
            return Err(RemoteError::Connectivity("network unreachable".into()));
        }
        let is_write = call.is_write();
        state.calls.push(call);
        if is_write {
            if let Some(error) = state.write_failure.clone() {
                return Err(error);
            }
        }
        Ok(state)
    }
}

fn matches_scope(record: &Value, scope: &CollectionScope) -> bool {
    scope.params().iter().all(|(column, expected)| match &record[column] {
        Value::String(value) => value == expected,
        Value::Null => false,
        other => other.to_string() == *expected,
    })
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn create(&self, kind: EntityKind, body: &Value) -> Result<Value, RemoteError> {
        let mut state = self.begin(RemoteCall::Create(kind))?;
        state.next_id += 1;
        let id = format!("srv-{}", state.next_id);
        let mut record = body.clone();
        record["id"] = json!(id.clone());
        state
            .collections
            .entry(kind)
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, kind: EntityKind, id: &str, body: &Value) -> Result<Value, RemoteError> {
        let mut state = self.begin(RemoteCall::Update(kind, id.to_string()))?;
        let records = state.collections.entry(kind).or_default();
        if !records.contains_key(id) {
            return Err(RemoteError::NotFound(format!("{kind} {id}")));
        }
        let mut record = body.clone();
        record["id"] = json!(id);
        records.insert(id.to_string(), record.clone());
        Ok(record)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError> {
        let mut state = self.begin(RemoteCall::Delete(kind, id.to_string()))?;
        match state.collections.entry(kind).or_default().remove(id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(format!("{kind} {id}"))),
        }
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Value, RemoteError> {
        let state = self.begin(RemoteCall::Get(kind, id.to_string()))?;
        state
            .collections
            .get(&kind)
            .and_then(|records| records.get(id).cloned())
            .ok_or_else(|| RemoteError::NotFound(format!("{kind} {id}")))
    }

    async fn list(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError> {
        let state = self.begin(RemoteCall::List(kind))?;
        Ok(state
            .collections
            .get(&kind)
            .map(|records| {
                records
                    .values()
                    .filter(|record| matches_scope(record, scope))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_summaries(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError> {
        let state = self.begin(RemoteCall::ListSummaries(kind))?;
        Ok(state
            .collections
            .get(&kind)
            .map(|records| {
                records
                    .values()
                    .filter(|record| matches_scope(record, scope))
                    .map(|record| json!({ "id": record["id"], "name": record["name"] }))
                    .collect()
            })
            .unwrap_or_default())
    }
}
