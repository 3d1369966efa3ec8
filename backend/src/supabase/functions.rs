use async_trait::async_trait;
use reqwest::Method;

use crate::error::AppError;
use crate::generation::{GenerateSubtasksRequest, GenerateSubtasksResponse, GenerationError, SubtaskGenerator};
use crate::supabase::SupabaseHttpClient;

pub const GENERATE_SUBTASKS: &str = "generate-subtasks";

#[async_trait]
impl SubtaskGenerator for SupabaseHttpClient {
    async fn generate(&self, access_token: Option<&str>, task_title: &str) -> Result<Vec<String>, AppError> {
        let url = self.config().function_url(GENERATE_SUBTASKS);
        let body = GenerateSubtasksRequest {
            task_title: Some(task_title.to_string()),
        };

        let response = self
            .request(Method::POST, &url, access_token)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from)?;

        let status = response.status();
        let body_text = response.text().await.map_err(GenerationError::from)?;
        let parsed = serde_json::from_str::<GenerateSubtasksResponse>(&body_text)
            .map_err(|e| GenerationError::InvalidJson(e.to_string()))?;

        if !status.is_success() {
            let detail = parsed.error.unwrap_or(body_text);
            tracing::error!("generate-subtasks returned {}: {}", status, detail);
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: detail,
            }
            .into());
        }

        parsed.subtasks.ok_or_else(|| GenerationError::NotAnArray.into())
    }
}
