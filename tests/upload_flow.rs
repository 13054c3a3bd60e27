//! End-to-end tests of the upload surface over the in-memory backends.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use depot_api::state::AppState;
use depot_core::config::AppConfig;
use depot_core::traits::quota::QuotaAccountant;
use depot_core::traits::storage::ObjectStore;
use depot_database::memory::{MemoryEntryStore, MemoryQuotaAccountant};
use depot_database::store::EntryStore;
use depot_service::activity::{ActivityNotifier, LogActivity};
use depot_service::hierarchy::HierarchyService;
use depot_service::upload::UploadEngine;
use depot_store::MemoryObjectStore;
use tower::ServiceExt;

const BOUNDARY: &str = "depot-test-boundary";

/// Test application context.
struct TestApp {
    router: Router,
    user_id: Uuid,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::default();
        let entries: Arc<dyn EntryStore> = Arc::new(MemoryEntryStore::new());
        let object_store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let quota: Arc<dyn QuotaAccountant> =
            Arc::new(MemoryQuotaAccountant::new(config.quota.default_limit_bytes));
        let activity: Arc<dyn ActivityNotifier> = Arc::new(LogActivity);

        let upload_engine = Arc::new(UploadEngine::new(
            Arc::clone(&entries),
            Arc::clone(&object_store),
            Arc::clone(&quota),
            Arc::clone(&activity),
            config.store.clone(),
        ));
        let hierarchy = Arc::new(HierarchyService::new(
            Arc::clone(&entries),
            Arc::clone(&activity),
        ));

        let state = AppState {
            config: Arc::new(config),
            entries,
            object_store,
            quota,
            upload_engine,
            hierarchy,
        };

        Self {
            router: depot_api::router::build_router(state),
            user_id: Uuid::new_v4(),
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user: Option<Uuid>,
    ) -> (StatusCode, Value) {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        if let Some(user) = user {
            req = req.header("X-User-Id", user.to_string());
        }

        let req = req.body(Body::from(body_str)).expect("Failed to build request");
        self.send(req).await
    }

    async fn send_chunk(&self, upload_id: Uuid, index: i32, data: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"uploadId\"\r\n\r\n{upload_id}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"chunkIndex\"\r\n\r\n{index}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"chunk\"; \
                 filename=\"blob\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/upload/chunk")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("X-User-Id", self.user_id.to_string())
            .body(Body::from(body))
            .expect("Failed to build chunk request");

        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        (status, body)
    }
}

fn uuid_field(body: &Value, field: &str) -> Uuid {
    body.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("missing uuid field '{field}' in {body}"))
}

#[tokio::test]
async fn test_chunked_upload_flow_out_of_order() {
    let app = TestApp::new();
    let user = Some(app.user_id);

    // Create a folder.
    let (status, body) = app
        .request(
            "POST",
            "/upload/folder",
            Some(serde_json::json!({"folderName": "docs", "folderSize": 0})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let folder_id = uuid_field(&body, "uploadId");

    // Initiate a 12 MB chunked upload inside it.
    let (status, body) = app
        .request(
            "POST",
            "/upload/initiate",
            Some(serde_json::json!({
                "fileName": "report.pdf",
                "fileSize": 12_000_000,
                "parent": folder_id,
                "resourceType": "chunked",
            })),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["totalChunks"], 3);
    let upload_id = uuid_field(&body, "uploadId");

    // Chunks arrive out of order; the third acceptance completes.
    for (i, index) in [2, 0, 1].into_iter().enumerate() {
        let (status, body) = app.send_chunk(upload_id, index, b"chunk-data").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        if i == 2 {
            assert_eq!(body["message"], "Upload completed");
        }
    }

    // Status reports completion.
    let (status, body) = app
        .request("GET", &format!("/upload/status/{upload_id}"), None, user)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["isComplete"], true);
    assert_eq!(body["progress"], 100.0);
    assert_eq!(body["status"], "completed");

    // The folder aggregate carries the declared size.
    let (status, body) = app.request("GET", "/upload/all", None, user).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "docs");
    assert_eq!(items[0]["size"], 12_000_000);

    // Folder-scoped listing shows the completed file.
    let (status, body) = app
        .request("GET", &format!("/upload/all?folderId={folder_id}"), None, user)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "report.pdf");
    assert_eq!(items[0]["status"], "completed");
    assert_eq!(items[0]["size"], 12_000_000);

    // Explicit complete is idempotent.
    let (status, body) = app
        .request(
            "POST",
            "/upload/complete",
            Some(serde_json::json!({"uploadId": upload_id})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    // Deleting the file drains the aggregate.
    let (status, body) = app
        .request("DELETE", &format!("/upload/{upload_id}"), None, user)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app.request("GET", "/upload/all", None, user).await;
    assert_eq!(body["items"][0]["size"], 0);
}

#[tokio::test]
async fn test_pause_and_resume_over_http() {
    let app = TestApp::new();
    let user = Some(app.user_id);

    let (_, body) = app
        .request(
            "POST",
            "/upload/initiate",
            Some(serde_json::json!({
                "fileName": "big.bin",
                "fileSize": 8_000_000,
                "resourceType": "chunked",
            })),
            user,
        )
        .await;
    assert_eq!(body["totalChunks"], 2);
    let upload_id = uuid_field(&body, "uploadId");

    app.send_chunk(upload_id, 0, b"part-zero").await;

    let (status, body) = app
        .request(
            "PUT",
            &format!("/upload/pause/{upload_id}?chunkIndex=0"),
            None,
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app
        .request("GET", &format!("/upload/status/{upload_id}"), None, user)
        .await;
    assert_eq!(body["status"], "paused");
    assert_eq!(body["uploadedChunks"], 0);

    // Resume: re-send chunk 0, then finish with chunk 1.
    app.send_chunk(upload_id, 0, b"part-zero").await;
    let (_, body) = app.send_chunk(upload_id, 1, b"part-one").await;
    assert_eq!(body["message"], "Upload completed");
}

#[tokio::test]
async fn test_move_and_cascade_delete_over_http() {
    let app = TestApp::new();
    let user = Some(app.user_id);

    let (_, body) = app
        .request(
            "POST",
            "/upload/folder",
            Some(serde_json::json!({"folderName": "A"})),
            user,
        )
        .await;
    let a = uuid_field(&body, "uploadId");

    let (_, body) = app
        .request(
            "POST",
            "/upload/folder",
            Some(serde_json::json!({"folderName": "B", "parent": a})),
            user,
        )
        .await;
    let b = uuid_field(&body, "uploadId");

    let (_, body) = app
        .request(
            "POST",
            "/upload/initiate",
            Some(serde_json::json!({
                "fileName": "x.txt",
                "fileSize": 1000,
                "parent": b,
            })),
            user,
        )
        .await;
    let x = uuid_field(&body, "uploadId");
    let (_, body) = app.send_chunk(x, 0, &[7u8; 1000]).await;
    assert_eq!(body["message"], "Upload completed");

    // Move B to the root; A drains, B keeps its aggregate.
    let (status, body) = app
        .request(
            "PUT",
            &format!("/upload/move/{b}"),
            Some(serde_json::json!({"newParentId": null})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app.request("GET", "/upload/all", None, user).await;
    let items = body["items"].as_array().unwrap();
    let sizes: Vec<(&str, i64)> = items
        .iter()
        .map(|i| (i["name"].as_str().unwrap(), i["size"].as_i64().unwrap()))
        .collect();
    assert!(sizes.contains(&("A", 0)));
    assert!(sizes.contains(&("B", 1000)));

    // Moving A under B is fine; moving B under its new descendant is not.
    let (status, _) = app
        .request(
            "PUT",
            &format!("/upload/move/{a}"),
            Some(serde_json::json!({"newParentId": b})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .request(
            "PUT",
            &format!("/upload/move/{b}"),
            Some(serde_json::json!({"newParentId": a})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Cascade delete B (now containing A and x.txt).
    let (status, body) = app
        .request(
            "DELETE",
            "/upload/all",
            Some(serde_json::json!({"uploadIds": [b]})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["removed"], 3);

    let (_, body) = app.request("GET", "/upload/all", None, user).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_error_mapping() {
    let app = TestApp::new();
    let user = Some(app.user_id);

    // Missing identity header.
    let (status, body) = app.request("GET", "/upload/all", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    // Unknown session.
    let (status, body) = app
        .request(
            "GET",
            &format!("/upload/status/{}", Uuid::new_v4()),
            None,
            user,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    // Duplicate sibling name.
    app.request(
        "POST",
        "/upload/folder",
        Some(serde_json::json!({"folderName": "dup"})),
        user,
    )
    .await;
    let (status, body) = app
        .request(
            "POST",
            "/upload/folder",
            Some(serde_json::json!({"folderName": "dup"})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Bad chunk index.
    let (_, body) = app
        .request(
            "POST",
            "/upload/initiate",
            Some(serde_json::json!({"fileName": "f.bin", "fileSize": 10})),
            user,
        )
        .await;
    let upload_id = uuid_field(&body, "uploadId");
    let (status, body) = app.send_chunk(upload_id, 5, b"x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // Empty file name.
    let (status, _) = app
        .request(
            "POST",
            "/upload/initiate",
            Some(serde_json::json!({"fileName": "", "fileSize": 10})),
            user,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.request("GET", "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}
