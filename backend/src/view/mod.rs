//! UI state for the dashboard, independent of any rendering toolkit.

pub mod dashboard;

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{
    NewTaskRequest, Priority, Subtask, Task, TaskStats, UpdateTaskRequest, User,
};

pub use dashboard::Dashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    Login,
    Signup,
    Dashboard,
    Profile,
}

impl Page {
    pub fn requires_session(self) -> bool {
        matches!(self, Page::Dashboard | Page::Profile)
    }
}

/// Create/edit form. `editing` holds the id of the task being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub editing: Option<String>,
}

impl TaskForm {
    pub fn for_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due_date: task.due_date,
            priority: task.priority,
            editing: Some(task.id.clone()),
        }
    }

    pub fn to_new_request(&self) -> NewTaskRequest {
        NewTaskRequest {
            title: self.title.trim().to_string(),
            description: non_empty(&self.description),
            due_date: self.due_date,
            status: None,
            priority: Some(self.priority),
        }
    }

    pub fn to_update_request(&self) -> UpdateTaskRequest {
        UpdateTaskRequest {
            title: Some(self.title.trim().to_string()),
            description: Some(non_empty(&self.description)),
            due_date: Some(self.due_date),
            status: None,
            priority: Some(self.priority),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub page: Page,
    pub user: Option<User>,
    pub tasks: Vec<Task>,
    pub recent_tasks: Vec<Task>,
    pub stats: TaskStats,
    pub subtasks: HashMap<String, Vec<Subtask>>,
    /// Open form, if any.
    pub form: Option<TaskForm>,
    /// Last failure, shown until dismissed.
    pub banner: Option<String>,
    /// Informational message (e.g. "check your inbox").
    pub notice: Option<String>,
    /// Task whose subtasks are being generated.
    pub generating: Option<String>,
}

impl ViewState {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .chain(self.recent_tasks.iter())
            .find(|task| task.id == id)
    }

    pub fn subtask(&self, task_id: &str, id: &str) -> Option<&Subtask> {
        self.subtasks
            .get(task_id)
            .and_then(|subtasks| subtasks.iter().find(|subtask| subtask.id == id))
    }

    pub fn display_name(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user.user_metadata
            .full_name
            .as_deref()
            .or(user.email.as_deref())
    }
}
