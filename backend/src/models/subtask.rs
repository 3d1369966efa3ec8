use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::task::{TaskStatus, validate_title};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubtaskRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl NewSubtaskRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: None,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubtaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl UpdateSubtaskRequest {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            title: None,
            status: Some(status),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }

    pub fn apply_to(self, subtask: &mut Subtask) {
        if let Some(title) = self.title {
            subtask.title = title;
        }
        if let Some(status) = self.status {
            subtask.status = status;
        }
    }
}
