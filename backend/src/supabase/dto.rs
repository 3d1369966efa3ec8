use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Priority, ProfileUpdate, Session, TaskStatus, User};

/// Error bodies differ between PostgREST, GoTrue and Storage; keep whatever
/// text field is present.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Debug, Serialize)]
pub struct SignUpBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpData<'a>,
}

#[derive(Debug, Serialize)]
pub struct SignUpData<'a> {
    pub full_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(User),
}

#[derive(Debug, Serialize)]
pub struct PasswordGrantBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserBody<'a> {
    pub data: &'a ProfileUpdate,
}

#[derive(Debug, Serialize)]
pub struct TaskInsert<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Debug, Serialize)]
pub struct SubtaskInsert<'a> {
    pub task_id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRow {
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_response_distinguishes_session_from_user() {
        let with_session: SignUpResponse = serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": { "id": "u1", "email": "a@b.c", "user_metadata": { "full_name": "A" } }
        }))
        .expect("session body should parse");
        assert!(matches!(with_session, SignUpResponse::Session(_)));

        let pending: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "a@b.c",
            "confirmation_sent_at": "2025-01-10T08:00:00Z"
        }))
        .expect("user body should parse");
        assert!(matches!(pending, SignUpResponse::User(_)));
    }

    #[test]
    fn error_body_prefers_message_fields() {
        let body: ErrorBody = serde_json::from_value(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        }))
        .expect("error body should parse");
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn insert_omits_unset_columns() {
        let insert = TaskInsert {
            user_id: "u1",
            title: "Plan",
            description: None,
            due_date: None,
            status: None,
            priority: Some(Priority::High),
        };
        let json = serde_json::to_value(&insert).expect("insert should serialize");
        assert_eq!(json, serde_json::json!({ "user_id": "u1", "title": "Plan", "priority": "high" }));
    }
}
