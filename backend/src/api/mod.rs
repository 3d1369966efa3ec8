use axum::Json;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequestParts, Path, Query};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, Method};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::generation::{GenerateSubtasksRequest, GenerateSubtasksResponse, GenerationError};
use crate::models::*;
use crate::services::AvatarUpload;
use crate::services::profile::MAX_AVATAR_BYTES;
use crate::state::AppState;

#[derive(Deserialize)]
struct ToggleRequest {
    current_status: TaskStatus,
}

#[derive(Deserialize)]
struct AvatarParams {
    file_name: String,
}

/// Session resolved from the `Authorization: Bearer` header.
pub struct AuthSession(pub Session);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        state.resolve_session(token).await.map(AuthSession)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

pub fn router(state: AppState) -> Router {
    let functions_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ]);

    let functions = Router::new()
        .route("/functions/v1/generate-subtasks", post(generate_subtasks))
        .layer(functions_cors);

    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/user", get(current_user))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/stats", get(task_stats))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .route("/tasks/{id}/toggle", post(toggle_task))
        .route("/tasks/{id}/subtasks", get(list_subtasks).post(create_subtask))
        .route("/subtasks/{id}", patch(update_subtask).delete(delete_subtask))
        .route("/subtasks/{id}/toggle", post(toggle_subtask))
        .route("/profile", patch(update_profile))
        .route(
            "/profile/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 1)),
        )
        .merge(functions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<SignUpOutcome>, AppError> {
    req.validate()?;
    let outcome = state.auth.sign_up(&req).await?;
    Ok(Json(outcome))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<Session>, AppError> {
    req.validate()?;
    let session = state.auth.sign_in(&req).await?;
    Ok(Json(session))
}

async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthenticated)?;
    state.auth.sign_out(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_user(AuthSession(session): AuthSession) -> Json<User> {
    Json(session.user)
}

async fn list_tasks(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.tasks.query_tasks(&session, &query).await?;
    Ok(Json(tasks))
}

/// Validates the body before the token is looked up, so a blank title never
/// costs a round trip.
async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    req.validate()?;
    let session = match bearer_token(&headers) {
        Some(token) => Some(state.resolve_session(token).await?),
        None => None,
    };

    let task = state.tasks.create_task(session.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn task_stats(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<TaskStats>, AppError> {
    let stats = state.tasks.task_stats(&session).await?;
    Ok(Json(stats))
}

async fn update_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = state.tasks.update_task(&session, &id, req).await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let task = state.tasks.delete_task(&session, &id).await?;
    Ok(Json(task))
}

async fn toggle_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<Task>, AppError> {
    let task = state
        .tasks
        .toggle_task_status(&session, &id, req.current_status)
        .await?;
    Ok(Json(task))
}

async fn list_subtasks(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<Subtask>>, AppError> {
    let subtasks = state.tasks.list_subtasks(&session, &task_id).await?;
    Ok(Json(subtasks))
}

async fn create_subtask(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<String>,
    Json(req): Json<NewSubtaskRequest>,
) -> Result<(StatusCode, Json<Subtask>), AppError> {
    let subtask = state.tasks.create_subtask(&session, &task_id, req).await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

async fn update_subtask(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubtaskRequest>,
) -> Result<Json<Subtask>, AppError> {
    let subtask = state.tasks.update_subtask(&session, &id, req).await?;
    Ok(Json(subtask))
}

async fn delete_subtask(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Subtask>, AppError> {
    let subtask = state.tasks.delete_subtask(&session, &id).await?;
    Ok(Json(subtask))
}

async fn toggle_subtask(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<Subtask>, AppError> {
    let subtask = state
        .tasks
        .toggle_subtask_status(&session, &id, req.current_status)
        .await?;
    Ok(Json(subtask))
}

async fn update_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    let user = state.profile.update_profile(&session, update).await?;
    Ok(Json(user))
}

async fn upload_avatar(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(params): Query<AvatarParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<User>, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let upload = AvatarUpload {
        file_name: params.file_name,
        content_type,
        bytes: body.to_vec(),
    };
    let user = state.profile.change_avatar(&session, upload).await?;
    Ok(Json(user))
}

/// Hosted copy of the `generate-subtasks` edge function.
async fn generate_subtasks(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<GenerateSubtasksResponse>) {
    let result = match serde_json::from_slice::<GenerateSubtasksRequest>(&body) {
        Ok(req) => state.subtask_proxy.generate(req.task_title.as_deref()).await,
        Err(e) => Err(GenerationError::InvalidBody(e.to_string())),
    };

    match result {
        Ok(subtasks) => (
            StatusCode::OK,
            Json(GenerateSubtasksResponse {
                subtasks: Some(subtasks),
                error: None,
            }),
        ),
        Err(e) => {
            let status = match e {
                GenerationError::MissingTitle => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::error!("generate-subtasks failed: {}", e);
            (
                status,
                Json(GenerateSubtasksResponse {
                    subtasks: None,
                    error: Some(e.public_message().to_string()),
                }),
            )
        }
    }
}
