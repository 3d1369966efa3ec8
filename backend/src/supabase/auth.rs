use async_trait::async_trait;
use reqwest::Method;
use tracing::info;

use crate::error::AppError;
use crate::models::{ProfileUpdate, Session, SignInRequest, SignUpOutcome, SignUpRequest, User};
use crate::supabase::{SupabaseHttpClient, dto, expect_success, read_json};

/// Hosted identity provider.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_up(&self, req: &SignUpRequest) -> Result<SignUpOutcome, AppError>;
    async fn sign_in(&self, req: &SignInRequest) -> Result<Session, AppError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
    async fn get_user(&self, access_token: &str) -> Result<User, AppError>;
    /// The provider merges `data` into the stored user metadata.
    async fn update_user(&self, access_token: &str, update: &ProfileUpdate) -> Result<User, AppError>;
}

#[async_trait]
impl AuthGateway for SupabaseHttpClient {
    async fn sign_up(&self, req: &SignUpRequest) -> Result<SignUpOutcome, AppError> {
        let body = dto::SignUpBody {
            email: &req.email,
            password: &req.password,
            data: dto::SignUpData {
                full_name: &req.full_name,
            },
        };

        let response = self
            .request(Method::POST, &self.config().auth_url("signup"), None)
            .json(&body)
            .send()
            .await?;

        let outcome = match read_json::<dto::SignUpResponse>(response).await? {
            dto::SignUpResponse::Session(session) => SignUpOutcome::SignedIn { session },
            dto::SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired { user },
        };
        info!("signed up {}", req.email);
        Ok(outcome)
    }

    async fn sign_in(&self, req: &SignInRequest) -> Result<Session, AppError> {
        let body = dto::PasswordGrantBody {
            email: &req.email,
            password: &req.password,
        };

        let response = self
            .request(Method::POST, &self.config().auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .request(Method::POST, &self.config().auth_url("logout"), Some(access_token))
            .send()
            .await?;

        expect_success(response).await
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        let response = self
            .request(Method::GET, &self.config().auth_url("user"), Some(access_token))
            .send()
            .await?;

        read_json(response).await
    }

    async fn update_user(&self, access_token: &str, update: &ProfileUpdate) -> Result<User, AppError> {
        let response = self
            .request(Method::PUT, &self.config().auth_url("user"), Some(access_token))
            .json(&dto::UpdateUserBody { data: update })
            .send()
            .await?;

        read_json(response).await
    }
}
