mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{EVENTS_TOKEN, GatewayFailure, Harness, IDENTITY_HEADER, OTHER, OWNER};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use upload_orchestrator::{
    app,
    handlers::{event_handlers::EventBatchSummary, identity::EVENTS_TOKEN_HEADER},
    models::file::FileStatus,
};
use uuid::Uuid;

fn router(h: &Harness) -> Router {
    app(h.state())
}

fn request(method: Method, uri: &str, owner: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(IDENTITY_HEADER, owner);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

fn event_request(token: Option<&str>, body: Value) -> Request<Body> {
    let mut req = request(Method::POST, "/events/object-created", None, Some(body));
    if let Some(token) = token {
        req.headers_mut()
            .insert(EVENTS_TOKEN_HEADER, token.parse().unwrap());
    }
    req
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn healthz_is_ok() {
    let h = Harness::new();
    let (status, body) = send(router(&h), request(Method::GET, "/healthz", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(router(&h), request(Method::GET, "/readyz", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["metadata"]["ok"], true);
}

#[tokio::test]
async fn begin_upload_without_identity_is_unauthorized() {
    let h = Harness::new();
    let (status, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            None,
            Some(json!({"name": "a.txt", "mimeType": "text/plain", "declaredSize": 10})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "auth_error");
    assert_eq!(h.repo.len(), 0);
}

#[tokio::test]
async fn begin_upload_returns_single_url() {
    let h = Harness::new();
    let (status, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"fileName": "a.txt", "fileType": "text/plain", "fileSize": 10})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["uploadURL"].as_str().unwrap().contains("op=put"));
    let file_id: Uuid = body["fileID"].as_str().unwrap().parse().unwrap();
    assert_eq!(h.repo.snapshot(file_id).unwrap().owner_id, OWNER);
}

#[tokio::test]
async fn multipart_round_trip_over_http() {
    let h = Harness::new();
    let (status, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({
                "name": "movie.mp4",
                "mimeType": "video/mp4",
                "declaredSize": 500_000_000,
                "chunkSize": 50_000_000
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partURLs"].as_array().unwrap().len(), 10);
    let file_id = body["fileID"].as_str().unwrap().to_string();
    let upload_id = body["uploadID"].as_str().unwrap().to_string();

    let complete = json!({
        "fileID": file_id,
        "uploadID": upload_id,
        "parts": [
            {"partNumber": 2, "eTag": "\"b\""},
            {"PartNumber": 1, "ETag": "\"a\""}
        ]
    });
    let (status, body) = send(
        router(&h),
        request(Method::POST, "/uploads/complete", Some(OWNER), Some(complete.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileID"], file_id.as_str());

    let (status, body) = send(
        router(&h),
        request(Method::POST, "/uploads/complete", Some(OWNER), Some(complete)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_completed");

    let id: Uuid = file_id.parse().unwrap();
    assert_eq!(h.repo.snapshot(id).unwrap().status, FileStatus::Completed);
}

#[tokio::test]
async fn store_failure_on_completion_is_bad_gateway() {
    let h = Harness::new();
    let (_, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"name": "movie.mp4", "declaredSize": 500_000_000, "chunkSize": 50_000_000})),
        ),
    )
    .await;
    let file_id = body["fileID"].as_str().unwrap().to_string();
    let upload_id = body["uploadID"].as_str().unwrap().to_string();
    h.gateway.fail_with(GatewayFailure::Complete);

    let complete = json!({
        "fileID": file_id,
        "uploadID": upload_id,
        "parts": [{"partNumber": 1, "eTag": "\"a\""}]
    });
    let (status, body) = send(
        router(&h),
        request(Method::POST, "/uploads/complete", Some(OWNER), Some(complete)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_error");
    let id: Uuid = file_id.parse().unwrap();
    assert_eq!(h.repo.snapshot(id).unwrap().status, FileStatus::Uploading);
}

#[tokio::test]
async fn part_limit_maps_to_unprocessable() {
    let h = Harness::new();
    let (status, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"name": "huge", "declaredSize": 1_000_000_000, "chunkSize": 1024})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "part_limit_exceeded");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let h = Harness::new();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/uploads")
        .header(IDENTITY_HEADER, OWNER)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(router(&h), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn delete_by_non_owner_is_forbidden() {
    let h = Harness::new();
    let (_, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"name": "a.txt", "declaredSize": 10})),
        ),
    )
    .await;
    let file_id = body["fileID"].as_str().unwrap().to_string();
    let uri = format!("/files/{file_id}");

    let (status, body) = send(router(&h), request(Method::DELETE, &uri, Some(OTHER), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ownership_error");
    assert!(h.gateway.calls().deleted.is_empty());

    let (status, body) = send(router(&h), request(Method::DELETE, &uri, Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        format!("File {file_id} deleted successfully").as_str()
    );

    let (status, _) = send(router(&h), request(Method::GET, &uri, Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_requires_file_id_and_owner() {
    let h = Harness::new();
    let (_, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"name": "a.txt", "mimeType": "text/plain", "declaredSize": 10})),
        ),
    )
    .await;
    let file_id = body["fileID"].as_str().unwrap().to_string();

    let (status, _) = send(router(&h), request(Method::GET, "/downloads", Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/downloads?fileID={file_id}");
    let (status, _) = send(router(&h), request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(router(&h), request(Method::GET, &uri, Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileName"], "a.txt");
    assert_eq!(body["contentType"], "text/plain");
}

#[tokio::test]
async fn list_files_is_scoped_to_caller() {
    let h = Harness::new();
    for owner in [OWNER, OWNER, OTHER] {
        send(
            router(&h),
            request(
                Method::POST,
                "/uploads",
                Some(owner),
                Some(json!({"name": "a.txt", "declaredSize": 10})),
            ),
        )
        .await;
    }

    let (status, body) = send(router(&h), request(Method::GET, "/files", Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::OK);
    let files = body.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f["ownerID"] == OWNER));
}

#[tokio::test]
async fn object_created_batch_skips_malformed_records() {
    let h = Harness::new();
    let (_, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"name": "a.txt", "declaredSize": 10})),
        ),
    )
    .await;
    let file_id = body["fileID"].as_str().unwrap().to_string();

    let events = json!({
        "Records": [
            {"eventName": "ObjectCreated:Put", "s3": {"object": {"key": file_id, "size": 12}}},
            {"eventName": "ObjectCreated:Put", "s3": {"object": {"key": "not-a-uuid", "size": 1}}},
            {"eventName": "ObjectCreated:Put", "s3": {}},
            {"eventName": "ObjectRemoved:Delete", "s3": {"object": {"key": file_id, "size": 0}}},
            "garbage"
        ]
    });
    let (status, body) = send(router(&h), event_request(Some(EVENTS_TOKEN), events)).await;

    assert_eq!(status, StatusCode::OK);
    let summary: EventBatchSummary = serde_json::from_value(body).unwrap();
    assert_eq!(
        summary,
        EventBatchSummary {
            processed: 1,
            completed: 1,
            skipped: 4,
        }
    );

    let record = h.repo.snapshot(file_id.parse().unwrap()).unwrap();
    assert_eq!(record.status, FileStatus::Completed);
    assert_eq!(record.declared_size, 12);
}

#[tokio::test]
async fn object_created_without_records_is_bad_request() {
    let h = Harness::new();
    let (status, _) = send(
        router(&h),
        event_request(Some(EVENTS_TOKEN), json!({"foo": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn object_created_requires_events_token() {
    let h = Harness::new();
    let (_, body) = send(
        router(&h),
        request(
            Method::POST,
            "/uploads",
            Some(OWNER),
            Some(json!({"name": "a.txt", "declaredSize": 10})),
        ),
    )
    .await;
    let file_id = body["fileID"].as_str().unwrap().to_string();
    let events = json!({"Records": [{"s3": {"object": {"key": file_id, "size": 1}}}]});

    for token in [None, Some("wrong"), Some("")] {
        let (status, body) = send(router(&h), event_request(token, events.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{token:?}");
        assert_eq!(body["code"], "auth_error");
    }

    // A user identity is not an events credential.
    let mut as_owner = event_request(None, events.clone());
    as_owner
        .headers_mut()
        .insert(IDENTITY_HEADER, OWNER.parse().unwrap());
    let (status, _) = send(router(&h), as_owner).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let record = h.repo.snapshot(file_id.parse().unwrap()).unwrap();
    assert_eq!(record.status, FileStatus::Pending);
    assert_eq!(record.declared_size, 10);
}

#[tokio::test]
async fn object_created_is_refused_when_no_token_is_configured() {
    let h = Harness::new();
    let unguarded = app(h.state().with_events_token(None));
    let events = json!({"Records": []});

    let (status, _) = send(unguarded, event_request(Some(EVENTS_TOKEN), events)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
