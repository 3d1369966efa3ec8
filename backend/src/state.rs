use std::sync::Arc;

use crate::error::AppError;
use crate::generation::SubtaskProxy;
use crate::models::Session;
use crate::services::{ProfileService, TaskService};
use crate::supabase::AuthGateway;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthGateway>,
    pub tasks: TaskService,
    pub profile: ProfileService,
    pub subtask_proxy: Arc<SubtaskProxy>,
}

impl AppState {
    /// Looks up the owner of a bearer token with the identity provider.
    pub async fn resolve_session(&self, access_token: &str) -> Result<Session, AppError> {
        let user = self.auth.get_user(access_token).await?;
        Ok(Session {
            access_token: access_token.to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
            refresh_token: None,
            user,
        })
    }
}
