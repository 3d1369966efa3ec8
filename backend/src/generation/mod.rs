//! Subtask generation: a task title goes to a chat-completion model which
//! answers with a bare JSON array of subtask titles.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

pub use openai::OpenAiClient;

pub const SYSTEM_PROMPT: &str = r#"Break down the main task provided as "{{PARENT_TASK_TITLE}}" into a list of 5 to 7 practical, concise subtasks written in plain language. Subtasks should cover the essential steps needed to complete the main task. Return the subtasks as a plain JSON array, without any additional explanations, text, or formatting. Each subtask should be clear, specific, and actionable.

Output format: A single JSON array with each subtask as a string element.

Example:
Input: Plan a wedding
Output:
["Book wedding venue", "Hire photographer", "Send invitations", "Arrange catering", "Plan wedding ceremony", "Choose wedding dress", "Plan honeymoon"]

(For real tasks, substitute the task title and subtasks as appropriate. Outputs should be short, direct, and focused on completion steps.)

REMINDER: Your main objectives are to generate 5-7 clear, actionable subtasks for the given task, written in plain language, and return them in a JSON array with no extra explanation or formatting."#;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Task title is required")]
    MissingTitle,

    #[error("OpenAI API key not configured")]
    MissingApiKey,

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("No subtasks generated")]
    EmptyCompletion,

    #[error("completion is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("completion is not a JSON array")]
    NotAnArray,

    #[error("subtask at index {0} is not a string")]
    NotAString(usize),

    #[error("subtask at index {0} is blank")]
    BlankSubtask(usize),

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl GenerationError {
    /// Message returned in the function's `{ "error": ... }` body.
    pub fn public_message(&self) -> &'static str {
        match self {
            GenerationError::MissingTitle => "Task title is required",
            GenerationError::MissingApiKey => "OpenAI API key not configured",
            GenerationError::Transport(_) | GenerationError::Upstream { .. } => {
                "Failed to generate subtasks"
            }
            GenerationError::EmptyCompletion => "No subtasks generated",
            GenerationError::InvalidJson(_)
            | GenerationError::NotAnArray
            | GenerationError::NotAString(_)
            | GenerationError::BlankSubtask(_) => "Failed to parse generated subtasks",
            GenerationError::InvalidBody(_) => "Internal server error",
        }
    }
}

/// Parses the model's answer. Either the whole array of strings is returned or
/// an error; never a partial list.
pub fn parse_subtasks(text: &str) -> Result<Vec<String>, GenerationError> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| GenerationError::InvalidJson(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Err(GenerationError::NotAnArray),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            serde_json::Value::String(title) => Ok(title),
            _ => Err(GenerationError::NotAString(index)),
        })
        .collect()
}

/// Body of `POST /functions/v1/generate-subtasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateSubtasksRequest {
    #[serde(rename = "taskTitle", default)]
    pub task_title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateSubtasksResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Chat-completion backend used by the function endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String, GenerationError>;
}

/// Client-side view of the function endpoint.
#[async_trait]
pub trait SubtaskGenerator: Send + Sync {
    async fn generate(&self, access_token: Option<&str>, task_title: &str) -> Result<Vec<String>, AppError>;
}

/// Server side of the function: title in, subtask titles out.
pub struct SubtaskProxy {
    completion: Arc<dyn CompletionClient>,
}

impl SubtaskProxy {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Only a missing or empty title is refused; anything else goes to the
    /// model as given.
    pub async fn generate(&self, task_title: Option<&str>) -> Result<Vec<String>, GenerationError> {
        let title = task_title
            .filter(|title| !title.is_empty())
            .ok_or(GenerationError::MissingTitle)?;

        let text = self.completion.complete(SYSTEM_PROMPT, title).await?;
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        let subtasks = parse_subtasks(&text)?;
        tracing::info!("generated {} subtasks for {:?}", subtasks.len(), title);
        Ok(subtasks)
    }
}
