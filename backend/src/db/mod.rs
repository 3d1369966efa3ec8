pub mod repository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::error::AppError;
use crate::models::{
    NewSubtaskRequest, NewTaskRequest, Session, Subtask, Task, TaskQuery, TaskStatus,
    UpdateSubtaskRequest, UpdateTaskRequest,
};
use crate::repository::{SubtaskStore, TaskStore};

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    migrate(&pool).await?;
    info!("connected to {}", database_url);
    Ok(pool)
}

/// Single connection, since every in-memory connection is its own database.
pub async fn connect_in_memory() -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Config(format!("migration failed: {}", e)))
}

/// Local `tasks`/`subtasks` store. Every statement is filtered by the
/// session's user id, mirroring the hosted row-level policy.
#[derive(Clone, Debug)]
pub struct SqliteTaskStore {
    db: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list_tasks(&self, session: &Session, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        Ok(repository::fetch_tasks(&self.db, session.user_id(), query).await?)
    }

    async fn create_task(&self, session: &Session, req: &NewTaskRequest) -> Result<Task, AppError> {
        Ok(repository::insert_task(&self.db, session.user_id(), req).await?)
    }

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        patch: &UpdateTaskRequest,
    ) -> Result<Task, AppError> {
        repository::update_task(&self.db, session.user_id(), id, patch.clone())
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn delete_task(&self, session: &Session, id: &str) -> Result<Task, AppError> {
        repository::delete_task(&self.db, session.user_id(), id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn task_statuses(&self, session: &Session) -> Result<Vec<TaskStatus>, AppError> {
        Ok(repository::fetch_task_statuses(&self.db, session.user_id()).await?)
    }
}

#[async_trait]
impl SubtaskStore for SqliteTaskStore {
    async fn list_subtasks(&self, session: &Session, task_id: &str) -> Result<Vec<Subtask>, AppError> {
        Ok(repository::fetch_subtasks(&self.db, session.user_id(), task_id).await?)
    }

    async fn create_subtask(
        &self,
        session: &Session,
        task_id: &str,
        req: &NewSubtaskRequest,
    ) -> Result<Subtask, AppError> {
        Ok(repository::insert_subtask(&self.db, session.user_id(), task_id, req).await?)
    }

    async fn update_subtask(
        &self,
        session: &Session,
        id: &str,
        patch: &UpdateSubtaskRequest,
    ) -> Result<Subtask, AppError> {
        repository::update_subtask(&self.db, session.user_id(), id, patch.clone())
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn delete_subtask(&self, session: &Session, id: &str) -> Result<Subtask, AppError> {
        repository::delete_subtask(&self.db, session.user_id(), id)
            .await?
            .ok_or(AppError::NotFound)
    }
}
