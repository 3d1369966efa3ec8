use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use reqwest::header::ACCEPT;

use crate::error::AppError;
use crate::models::{
    NewSubtaskRequest, NewTaskRequest, Session, Subtask, Task, TaskQuery, TaskStatus,
    UpdateSubtaskRequest, UpdateTaskRequest,
};
use crate::repository::{SubtaskStore, TaskStore};
use crate::supabase::{SupabaseHttpClient, dto, read_json};

const TASKS: &str = "tasks";
const SUBTASKS: &str = "subtasks";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// `tasks`/`subtasks` over PostgREST.
#[derive(Clone, Debug)]
pub struct SupabaseTaskStore {
    client: SupabaseHttpClient,
}

impl SupabaseTaskStore {
    pub fn new(client: SupabaseHttpClient) -> Self {
        Self { client }
    }

    fn table(&self, method: Method, table: &str, session: &Session) -> RequestBuilder {
        let url = self.client.config().rest_url(table);
        self.client.request(method, &url, Some(&session.access_token))
    }

    /// Write that returns exactly one row.
    fn single_row(&self, method: Method, table: &str, session: &Session) -> RequestBuilder {
        self.table(method, table, session)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

pub(crate) fn task_query_params(query: &TaskQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if let Some(status) = query.status {
        params.push(("status", eq(status.as_str())));
    }
    if let Some(priority) = query.priority {
        params.push(("priority", eq(priority.as_str())));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

#[async_trait]
impl TaskStore for SupabaseTaskStore {
    async fn list_tasks(&self, session: &Session, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let response = self
            .table(Method::GET, TASKS, session)
            .query(&task_query_params(query))
            .send()
            .await?;

        read_json(response).await
    }

    async fn create_task(&self, session: &Session, req: &NewTaskRequest) -> Result<Task, AppError> {
        let insert = dto::TaskInsert {
            user_id: session.user_id(),
            title: &req.title,
            description: req.description.as_deref(),
            due_date: req.due_date,
            status: req.status,
            priority: req.priority,
        };

        let response = self
            .single_row(Method::POST, TASKS, session)
            .json(&insert)
            .send()
            .await?;

        read_json(response).await
    }

    async fn update_task(
        &self,
        session: &Session,
        id: &str,
        patch: &UpdateTaskRequest,
    ) -> Result<Task, AppError> {
        let response = self
            .single_row(Method::PATCH, TASKS, session)
            .query(&[("id", eq(id))])
            .json(patch)
            .send()
            .await?;

        read_json(response).await
    }

    async fn delete_task(&self, session: &Session, id: &str) -> Result<Task, AppError> {
        let response = self
            .single_row(Method::DELETE, TASKS, session)
            .query(&[("id", eq(id))])
            .send()
            .await?;

        read_json(response).await
    }

    async fn task_statuses(&self, session: &Session) -> Result<Vec<TaskStatus>, AppError> {
        let response = self
            .table(Method::GET, TASKS, session)
            .query(&[("select", "status")])
            .send()
            .await?;

        let rows: Vec<dto::StatusRow> = read_json(response).await?;
        Ok(rows.into_iter().map(|row| row.status).collect())
    }
}

#[async_trait]
impl SubtaskStore for SupabaseTaskStore {
    async fn list_subtasks(&self, session: &Session, task_id: &str) -> Result<Vec<Subtask>, AppError> {
        let response = self
            .table(Method::GET, SUBTASKS, session)
            .query(&[
                ("select", "*".to_string()),
                ("task_id", eq(task_id)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;

        read_json(response).await
    }

    async fn create_subtask(
        &self,
        session: &Session,
        task_id: &str,
        req: &NewSubtaskRequest,
    ) -> Result<Subtask, AppError> {
        let insert = dto::SubtaskInsert {
            task_id,
            user_id: session.user_id(),
            title: &req.title,
            status: req.status,
        };

        let response = self
            .single_row(Method::POST, SUBTASKS, session)
            .json(&insert)
            .send()
            .await?;

        read_json(response).await
    }

    async fn update_subtask(
        &self,
        session: &Session,
        id: &str,
        patch: &UpdateSubtaskRequest,
    ) -> Result<Subtask, AppError> {
        let response = self
            .single_row(Method::PATCH, SUBTASKS, session)
            .query(&[("id", eq(id))])
            .json(patch)
            .send()
            .await?;

        read_json(response).await
    }

    async fn delete_subtask(&self, session: &Session, id: &str) -> Result<Subtask, AppError> {
        let response = self
            .single_row(Method::DELETE, SUBTASKS, session)
            .query(&[("id", eq(id))])
            .send()
            .await?;

        read_json(response).await
    }
}
