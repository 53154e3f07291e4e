use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::application::ports::remote_api::{CollectionScope, RemoteApi, RemoteError};
use crate::application::ports::CredentialProvider;
use crate::domain::value_objects::EntityKind;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;

const MAX_LOG_BODY_CHARS: usize = 512;

/// `RemoteApi` over REST/JSON: `/{collection}` and `/{collection}/{id}`.
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

fn log_response(status: StatusCode, body: &str) {
    if status.is_success() {
        debug!(%status, "remote response");
        return;
    }

    let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        preview.push_str("...");
    }
    debug!(%status, body = %preview, "remote error response");
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_connect() || err.is_timeout() {
        RemoteError::Connectivity(err.to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// Pulls a human readable message out of an error body (`{"message": ...}` or
/// `{"error": ...}`), falling back to the raw text.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "empty response body".to_string()
    } else {
        body.chars().take(MAX_LOG_BODY_CHARS).collect()
    }
}

/// Collections come back either as a bare array or wrapped in `data`/`items`.
fn into_list(value: Value) -> Result<Vec<Value>, RemoteError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in ["data", "items", "results"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return Ok(items);
                }
            }
            Err(RemoteError::Decode(
                "expected a JSON array of records".to_string(),
            ))
        }
        // An empty body is not an empty collection; reconciling it would drop every
        // synced record in scope.
        Value::Null => Err(RemoteError::Decode(
            "empty body where a collection was expected".to_string(),
        )),
        _ => Err(RemoteError::Decode(
            "expected a JSON array of records".to_string(),
        )),
    }
}

impl HttpRemoteApi {
    pub fn new(
        config: &RemoteConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;

        // A trailing slash keeps the base path when segments are appended.
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| {
            AppError::ConfigurationError(format!("invalid remote base_url {base}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigurationError(format!(
                "remote base_url {base} cannot carry paths"
            )));
        }

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn url(&self, kind: EntityKind, id: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Transport("base url cannot carry paths".to_string()))?;
            segments.pop_if_empty().push(kind.collection_path());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let token = self
            .credentials
            .bearer_token()
            .await
            .map_err(|e| RemoteError::Unauthorized(e.to_string()))?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| RemoteError::Unauthorized(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send(&self, request: RequestBuilder, target: &str) -> Result<Value, RemoteError> {
        let response = request
            .headers(self.headers().await?)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        log_response(status, &body);

        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(target.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized(error_message(&body)));
        }
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn fetch_collection(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
        summaries: bool,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut url = self.url(kind, None)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in scope.params() {
                query.append_pair(key, value);
            }
            if summaries {
                query.append_pair("view", "summary");
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let value = self
            .send(self.client.get(url), kind.collection_path())
            .await?;
        into_list(value)
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn create(&self, kind: EntityKind, body: &Value) -> Result<Value, RemoteError> {
        let url = self.url(kind, None)?;
        self.send(self.client.post(url).json(body), kind.collection_path())
            .await
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        body: &Value,
    ) -> Result<Value, RemoteError> {
        let url = self.url(kind, Some(id))?;
        let target = format!("{}/{id}", kind.collection_path());
        self.send(self.client.put(url).json(body), &target).await
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError> {
        let url = self.url(kind, Some(id))?;
        let target = format!("{}/{id}", kind.collection_path());
        self.send(self.client.delete(url), &target).await?;
        Ok(())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Value, RemoteError> {
        let url = self.url(kind, Some(id))?;
        let target = format!("{}/{id}", kind.collection_path());
        self.send(self.client.get(url), &target).await
    }

    async fn list(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError> {
        self.fetch_collection(kind, scope, false).await
    }

    async fn list_summaries(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError> {
        self.fetch_collection(kind, scope, true).await
    }
}
