use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use taskboard::config::SupabaseConfig;
use taskboard::error::AppError;
use taskboard::generation::SubtaskGenerator;
use taskboard::models::*;
use taskboard::repository::{SubtaskStore, TaskStore};
use taskboard::supabase::{AuthGateway, ObjectStorage, SupabaseHttpClient, SupabaseTaskStore};

const ANON_KEY: &str = "anon-key";
const TOKEN: &str = "user-token";

/// Serves `app` on an ephemeral local port and returns a client pointed at it.
async fn serve(app: Router) -> SupabaseHttpClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    SupabaseHttpClient::new(SupabaseConfig::new(format!("http://{}", addr), ANON_KEY))
        .expect("Failed to create client")
}

fn session() -> Session {
    Session {
        access_token: TOKEN.to_string(),
        token_type: "bearer".to_string(),
        expires_in: Some(3600),
        refresh_token: None,
        user: User {
            id: "u1".to_string(),
            email: Some("u1@example.com".to_string()),
            user_metadata: UserMetadata::default(),
        },
    }
}

fn task_json(id: &str) -> Value {
    json!({
        "id": id,
        "user_id": "u1",
        "title": "Write report",
        "description": null,
        "due_date": null,
        "status": "pending",
        "priority": "medium",
        "created_at": "2025-01-10T08:00:00+00:00",
        "updated_at": "2025-01-10T08:00:00+00:00"
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

fn authorized(headers: &HeaderMap) -> bool {
    header(headers, "apikey") == ANON_KEY && header(headers, "authorization") == format!("Bearer {}", TOKEN)
}

/// Single-row writes must ask PostgREST for exactly one object back.
fn single_row(headers: &HeaderMap) -> bool {
    authorized(headers)
        && header(headers, "prefer") == "return=representation"
        && header(headers, "accept") == "application/vnd.pgrst.object+json"
}

async fn function_replying(status: StatusCode, body: &'static str) -> SupabaseHttpClient {
    serve(Router::new().route(
        "/functions/v1/generate-subtasks",
        post(move || async move { (status, body) }),
    ))
    .await
}

#[tokio::test]
async fn test_function_success_returns_list() {
    let client = serve(Router::new().route(
        "/functions/v1/generate-subtasks",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            if !authorized(&headers) || body["taskTitle"] != "Plan a wedding" {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unexpected request" })));
            }
            (StatusCode::OK, Json(json!({ "subtasks": ["Book venue", "Hire photographer"] })))
        }),
    ))
    .await;

    let subtasks = client
        .generate(Some(TOKEN), "Plan a wedding")
        .await
        .expect("Failed to generate");
    assert_eq!(subtasks, vec!["Book venue", "Hire photographer"]);
}

#[tokio::test]
async fn test_function_failures_degrade_to_generic_error() {
    for (status, body) in [
        (StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"OpenAI API key not configured"}"#),
        (StatusCode::OK, r#"{}"#),
        (StatusCode::OK, "<html>bad gateway</html>"),
        (StatusCode::BAD_GATEWAY, ""),
    ] {
        let client = function_replying(status, body).await;

        let err = client
            .generate(Some(TOKEN), "Plan a wedding")
            .await
            .expect_err("reply should be rejected");
        assert!(matches!(err, AppError::Generation(_)), "{} {:?}", status, body);
        assert_eq!(err.user_message(), "Failed to generate subtasks");
    }
}

#[tokio::test]
async fn test_list_tasks_sends_filters() {
    let client = serve(Router::new().route(
        "/rest/v1/tasks",
        get(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
            let expected = params.get("select").map(String::as_str) == Some("*")
                && params.get("order").map(String::as_str) == Some("created_at.desc")
                && params.get("limit").map(String::as_str) == Some("6");
            if !authorized(&headers) || !expected {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unexpected query" })));
            }
            (StatusCode::OK, Json(json!([task_json("t1"), task_json("t2")])))
        }),
    ))
    .await;
    let store = SupabaseTaskStore::new(client);

    let tasks = store
        .list_tasks(&session(), &TaskQuery::recent(6))
        .await
        .expect("Failed to list tasks");
    let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
}

#[tokio::test]
async fn test_create_task_is_single_row_write() {
    let client = serve(Router::new().route(
        "/rest/v1/tasks",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            if !single_row(&headers) || body["user_id"] != "u1" || body.get("status").is_some() {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unexpected insert" })));
            }
            (StatusCode::CREATED, Json(task_json("t9")))
        }),
    ))
    .await;
    let store = SupabaseTaskStore::new(client);

    let task = store
        .create_task(&session(), &NewTaskRequest::new("Write report"))
        .await
        .expect("Failed to create task");
    assert_eq!(task.id, "t9");
}

#[tokio::test]
async fn test_no_matching_row_is_not_found() {
    let client = serve(Router::new().route(
        "/rest/v1/tasks",
        patch(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
            if !single_row(&headers) || params.get("id").map(String::as_str) != Some("eq.t404") {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unexpected update" })));
            }
            (
                StatusCode::NOT_ACCEPTABLE,
                Json(json!({
                    "code": "PGRST116",
                    "message": "JSON object requested, multiple (or no) rows returned"
                })),
            )
        })
        .delete(|| async { (StatusCode::NOT_FOUND, Json(json!({}))) }),
    ))
    .await;
    let store = SupabaseTaskStore::new(client);

    let updated = store
        .update_task(&session(), "t404", &UpdateTaskRequest::status(TaskStatus::Completed))
        .await;
    assert!(matches!(updated, Err(AppError::NotFound)));

    let deleted = store.delete_task(&session(), "t404").await;
    assert!(matches!(deleted, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_subtask_list_is_oldest_first() {
    let client = serve(Router::new().route(
        "/rest/v1/subtasks",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let expected = params.get("task_id").map(String::as_str) == Some("eq.t1")
                && params.get("order").map(String::as_str) == Some("created_at.asc");
            if !expected {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unexpected query" })));
            }
            (StatusCode::OK, Json(json!([])))
        }),
    ))
    .await;
    let store = SupabaseTaskStore::new(client);

    let subtasks = store.list_subtasks(&session(), "t1").await.expect("Failed to list subtasks");
    assert!(subtasks.is_empty());
}

#[tokio::test]
async fn test_expired_token_is_unauthenticated() {
    let client = serve(Router::new().route(
        "/auth/v1/user",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "msg": "invalid JWT: token is expired" })),
            )
        }),
    ))
    .await;

    let result = client.get_user(TOKEN).await;
    assert!(matches!(result, Err(AppError::Unauthenticated)));
}

#[tokio::test]
async fn test_rejected_sign_in_keeps_provider_message() {
    let client = serve(Router::new().route(
        "/auth/v1/token",
        post(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
            // anon key stands in for the missing user token
            let anonymous = header(&headers, "authorization") == format!("Bearer {}", ANON_KEY);
            if !anonymous || params.get("grant_type").map(String::as_str) != Some("password") {
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "unexpected" })));
            }
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                })),
            )
        }),
    ))
    .await;

    let result = client
        .sign_in(&SignInRequest {
            email: "u1@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await;
    match result {
        Err(AppError::Backend { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_avatar_upload_targets_bucket_path() {
    let client = serve(Router::new().route(
        "/storage/v1/object/profile-images/avatars/u1-7.png",
        post(|headers: HeaderMap, body: axum::body::Bytes| async move {
            if !authorized(&headers) || header(&headers, "content-type") != "image/png" || body.len() != 3 {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unexpected upload" })));
            }
            (StatusCode::OK, Json(json!({ "Key": "profile-images/avatars/u1-7.png" })))
        }),
    ))
    .await;

    client
        .upload(TOKEN, "profile-images", "avatars/u1-7.png", "image/png", vec![1, 2, 3])
        .await
        .expect("Failed to upload");

    let url = client.public_url("profile-images", "avatars/u1-7.png");
    assert!(url.ends_with("/storage/v1/object/public/profile-images/avatars/u1-7.png"));
}
