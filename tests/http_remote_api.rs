use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assessment_sync::application::ports::{CollectionScope, RemoteApi, RemoteError};
use assessment_sync::infrastructure::remote::{HttpRemoteApi, StaticCredentials};
use assessment_sync::shared::config::RemoteConfig;
use assessment_sync::EntityKind;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    method: &'static str,
    path: String,
    authorization: Option<String>,
    query: HashMap<String, String>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn note(
    log: &Log,
    method: &'static str,
    path: String,
    headers: &HeaderMap,
    query: HashMap<String, String>,
) {
    log.lock().unwrap().push(Seen {
        method,
        path,
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        query,
    });
}

fn mock_router(log: Log) -> Router {
    Router::new()
        .route(
            "/api/dimensions",
            get({
                let log = log.clone();
                move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                    note(&log, "GET", "/api/dimensions".into(), &headers, query);
                    Json(json!({
                        "data": [
                            {"id": "dim-1", "organization_id": "org-1", "name": "Processes"},
                            {"id": "dim-2", "organization_id": "org-1", "name": "Data"}
                        ]
                    }))
                }
            })
            .post({
                let log = log.clone();
                move |headers: HeaderMap, Json(body): Json<Value>| async move {
                    note(&log, "POST", "/api/dimensions".into(), &headers, HashMap::new());
                    let mut created = body;
                    created["id"] = json!(42);
                    (StatusCode::CREATED, Json(created))
                }
            }),
        )
        .route(
            "/api/dimensions/:id",
            get({
                let log = log.clone();
                move |headers: HeaderMap, Path(id): Path<String>| async move {
                    note(&log, "GET", format!("/api/dimensions/{id}"), &headers, HashMap::new());
                    match id.as_str() {
                        "dim-1" => Json(json!({"id": "dim-1", "name": "Processes"})).into_response(),
                        "locked" => (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"message": "token expired"})),
                        )
                            .into_response(),
                        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response(),
                        _ => StatusCode::NOT_FOUND.into_response(),
                    }
                }
            })
            .put({
                let log = log.clone();
                move |headers: HeaderMap, Path(id): Path<String>, Json(body): Json<Value>| async move {
                    note(&log, "PUT", format!("/api/dimensions/{id}"), &headers, HashMap::new());
                    if id == "missing" {
                        return StatusCode::NOT_FOUND.into_response();
                    }
                    Json(body).into_response()
                }
            })
            .delete({
                let log = log.clone();
                move |headers: HeaderMap, Path(id): Path<String>| async move {
                    note(&log, "DELETE", format!("/api/dimensions/{id}"), &headers, HashMap::new());
                    StatusCode::NO_CONTENT
                }
            }),
        )
        .route("/api/cooperations", get(|| async { StatusCode::OK }))
        .route(
            "/api/assessments",
            get({
                let log = log.clone();
                move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                    note(&log, "GET", "/api/assessments".into(), &headers, query);
                    Json(json!([{"id": "as-1", "name": "Annual"}]))
                }
            }),
        )
}

async fn spawn_mock() -> (String, Log, tokio::task::JoinHandle<()>) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind remote mock");
    let addr = listener.local_addr().expect("mock addr");
    let app = mock_router(log.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve remote mock");
    });
    (format!("http://{addr}/api"), log, handle)
}

fn client(base_url: &str, token: Option<&str>) -> HttpRemoteApi {
    HttpRemoteApi::new(
        &RemoteConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        },
        Arc::new(StaticCredentials::new(token.map(str::to_string))),
    )
    .expect("http client")
}

#[tokio::test]
async fn writes_hit_rest_paths_with_the_bearer_token() {
    let (base_url, log, server) = spawn_mock().await;
    let api = client(&base_url, Some("secret-token"));

    let created = api
        .create(
            EntityKind::Dimension,
            &json!({"id": "local-1", "organization_id": "org-1", "name": "Skills"}),
        )
        .await
        .unwrap();
    assert_eq!(created["id"], json!(42));

    let updated = api
        .update(EntityKind::Dimension, "42", &json!({"id": "42", "name": "Skills+"}))
        .await
        .unwrap();
    assert_eq!(updated["name"], json!("Skills+"));
    api.delete(EntityKind::Dimension, "42").await.unwrap();

    let seen = log.lock().unwrap().clone();
    let calls: Vec<(&str, &str)> = seen
        .iter()
        .map(|s| (s.method, s.path.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("POST", "/api/dimensions"),
            ("PUT", "/api/dimensions/42"),
            ("DELETE", "/api/dimensions/42"),
        ]
    );
    assert!(seen
        .iter()
        .all(|s| s.authorization.as_deref() == Some("Bearer secret-token")));
    server.abort();
}

#[tokio::test]
async fn lists_send_scope_as_query_parameters() {
    let (base_url, log, server) = spawn_mock().await;
    let api = client(&base_url, None);

    let dimensions = api
        .list(
            EntityKind::Dimension,
            &CollectionScope::by("organization_id", "org-1"),
        )
        .await
        .unwrap();
    assert_eq!(dimensions.len(), 2);

    let summaries = api
        .list_summaries(EntityKind::Assessment, &CollectionScope::all())
        .await
        .unwrap();
    assert_eq!(summaries, vec![json!({"id": "as-1", "name": "Annual"})]);

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen[0].query.get("organization_id").map(String::as_str),
        Some("org-1")
    );
    assert_eq!(seen[0].authorization, None);
    assert_eq!(seen[1].query.get("view").map(String::as_str), Some("summary"));
    server.abort();
}

#[tokio::test]
async fn error_statuses_map_onto_remote_errors() {
    let (base_url, _log, server) = spawn_mock().await;
    let api = client(&base_url, Some("t"));

    assert_eq!(
        api.get(EntityKind::Dimension, "dim-1").await.unwrap()["name"],
        json!("Processes")
    );
    assert!(matches!(
        api.get(EntityKind::Dimension, "nope").await,
        Err(RemoteError::NotFound(_))
    ));
    assert!(matches!(
        api.update(EntityKind::Dimension, "missing", &json!({})).await,
        Err(RemoteError::NotFound(_))
    ));
    assert_eq!(
        api.get(EntityKind::Dimension, "locked").await.unwrap_err(),
        RemoteError::Unauthorized("token expired".into())
    );
    assert_eq!(
        api.get(EntityKind::Dimension, "broken").await.unwrap_err(),
        RemoteError::Status {
            status: 500,
            message: "database down".into()
        }
    );
    server.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{addr}/api"), None);
    let err = api
        .list(EntityKind::Cooperation, &CollectionScope::all())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Connectivity(_)), "{err:?}");
}

#[tokio::test]
async fn empty_list_body_is_a_decode_error() {
    let (base_url, _log, server) = spawn_mock().await;
    let api = client(&base_url, None);

    let err = api
        .list(
            EntityKind::Cooperation,
            &CollectionScope::by("organization_id", "org-1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)), "{err:?}");
    server.abort();
}
