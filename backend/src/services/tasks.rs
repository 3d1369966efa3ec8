use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{
    NewSubtaskRequest, NewTaskRequest, Priority, Session, Subtask, Task, TaskQuery, TaskStats,
    TaskStatus, UpdateSubtaskRequest, UpdateTaskRequest,
};
use crate::repository::{SubtaskStore, TaskStore};

/// How many tasks the dashboard shows as "recent".
pub const RECENT_TASK_LIMIT: u32 = 6;

/// Task and subtask operations on top of a store. Validation that needs no
/// round trip happens here, before the store is touched.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    subtasks: Arc<dyn SubtaskStore>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, subtasks: Arc<dyn SubtaskStore>) -> Self {
        Self { tasks, subtasks }
    }

    pub async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, AppError> {
        self.tasks.list_tasks(session, &TaskQuery::all()).await
    }

    pub async fn list_recent_tasks(&self, session: &Session, limit: u32) -> Result<Vec<Task>, AppError> {
        self.tasks.list_tasks(session, &TaskQuery::recent(limit)).await
    }

    pub async fn tasks_by_status(&self, session: &Session, status: TaskStatus) -> Result<Vec<Task>, AppError> {
        self.tasks.list_tasks(session, &TaskQuery::by_status(status)).await
    }

    pub async fn tasks_by_priority(&self, session: &Session, priority: Priority) -> Result<Vec<Task>, AppError> {
        self.tasks.list_tasks(session, &TaskQuery::by_priority(priority)).await
    }

    pub async fn query_tasks(&self, session: &Session, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        self.tasks.list_tasks(session, query).await
    }

    pub async fn create_task(
        &self,
        session: Option<&Session>,
        req: NewTaskRequest,
    ) -> Result<Task, AppError> {
        req.validate()?;
        let session = session.ok_or(AppError::Unauthenticated)?;

        let task = self.tasks.create_task(session, &req).await?;
        info!("created task {} for {}", task.id, session.user_id());
        Ok(task)
    }

    pub async fn update_task(
        &self,
        session: &Session,
        id: &str,
        patch: UpdateTaskRequest,
    ) -> Result<Task, AppError> {
        patch.validate()?;
        let task = self.tasks.update_task(session, id, &patch).await?;
        debug!("updated task {}", id);
        Ok(task)
    }

    pub async fn delete_task(&self, session: &Session, id: &str) -> Result<Task, AppError> {
        let task = self.tasks.delete_task(session, id).await?;
        info!("deleted task {}", id);
        Ok(task)
    }

    /// Writes the opposite of `current`; concurrent toggles are last write wins.
    pub async fn toggle_task_status(
        &self,
        session: &Session,
        id: &str,
        current: TaskStatus,
    ) -> Result<Task, AppError> {
        self.tasks
            .update_task(session, id, &UpdateTaskRequest::status(current.toggled()))
            .await
    }

    /// Recomputed from live data on every call.
    pub async fn task_stats(&self, session: &Session) -> Result<TaskStats, AppError> {
        let statuses = self.tasks.task_statuses(session).await?;
        Ok(TaskStats::tally(statuses))
    }

    pub async fn list_subtasks(&self, session: &Session, task_id: &str) -> Result<Vec<Subtask>, AppError> {
        self.subtasks.list_subtasks(session, task_id).await
    }

    pub async fn create_subtask(
        &self,
        session: &Session,
        task_id: &str,
        req: NewSubtaskRequest,
    ) -> Result<Subtask, AppError> {
        req.validate()?;
        let subtask = self.subtasks.create_subtask(session, task_id, &req).await?;
        debug!("created subtask {} under {}", subtask.id, task_id);
        Ok(subtask)
    }

    pub async fn update_subtask(
        &self,
        session: &Session,
        id: &str,
        patch: UpdateSubtaskRequest,
    ) -> Result<Subtask, AppError> {
        patch.validate()?;
        self.subtasks.update_subtask(session, id, &patch).await
    }

    pub async fn delete_subtask(&self, session: &Session, id: &str) -> Result<Subtask, AppError> {
        let subtask = self.subtasks.delete_subtask(session, id).await?;
        debug!("deleted subtask {}", id);
        Ok(subtask)
    }

    pub async fn toggle_subtask_status(
        &self,
        session: &Session,
        id: &str,
        current: TaskStatus,
    ) -> Result<Subtask, AppError> {
        self.subtasks
            .update_subtask(session, id, &UpdateSubtaskRequest::status(current.toggled()))
            .await
    }
}
