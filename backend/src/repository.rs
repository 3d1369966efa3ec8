//! Storage contract for the `tasks` and `subtasks` tables.
//!
//! Every call carries the caller's [`Session`]. The hosted store forwards its
//! bearer token and lets the backend's row-level policy scope the rows; the
//! SQLite store scopes each statement to the session's user id itself.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    NewSubtaskRequest, NewTaskRequest, Session, Subtask, Task, TaskQuery, TaskStatus,
    UpdateSubtaskRequest, UpdateTaskRequest,
};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Newest first.
    async fn list_tasks(&self, session: &Session, query: &TaskQuery) -> Result<Vec<Task>, AppError>;

    async fn create_task(&self, session: &Session, req: &NewTaskRequest) -> Result<Task, AppError>;

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        patch: &UpdateTaskRequest,
    ) -> Result<Task, AppError>;

    /// Returns the removed row.
    async fn delete_task(&self, session: &Session, id: &str) -> Result<Task, AppError>;

    /// Only the status column of every visible task.
    async fn task_statuses(&self, session: &Session) -> Result<Vec<TaskStatus>, AppError>;
}

#[async_trait]
pub trait SubtaskStore: Send + Sync {
    /// Oldest first.
    async fn list_subtasks(&self, session: &Session, task_id: &str) -> Result<Vec<Subtask>, AppError>;

    async fn create_subtask(
        &self,
        session: &Session,
        task_id: &str,
        req: &NewSubtaskRequest,
    ) -> Result<Subtask, AppError>;

    async fn update_subtask(
        &self,
        session: &Session,
        id: &str,
        patch: &UpdateSubtaskRequest,
    ) -> Result<Subtask, AppError>;

    async fn delete_subtask(&self, session: &Session, id: &str) -> Result<Subtask, AppError>;
}
