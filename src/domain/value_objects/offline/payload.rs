use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON request body carried by a queue item. Always an object so the record id can be
/// re-pointed after a rekey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct OfflinePayload(Value);

impl OfflinePayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Minimal body for a DELETE.
    pub fn id_only(id: &str) -> Self {
        let mut body = Map::new();
        body.insert("id".to_string(), Value::String(id.to_string()));
        Self(Value::Object(body))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Offline payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl From<OfflinePayload> for Value {
    fn from(payload: OfflinePayload) -> Self {
        payload.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_objects_are_accepted() {
        assert!(OfflinePayload::new(json!({"id": "a"})).is_ok());
        assert!(OfflinePayload::new(Value::Null).is_err());
        assert!(OfflinePayload::new(json!([1, 2])).is_err());
        assert!(OfflinePayload::from_json_str("{not json").is_err());
    }

    #[test]
    fn id_only_body() {
        assert_eq!(OfflinePayload::id_only("x").into_inner(), json!({"id": "x"}));
    }
}
