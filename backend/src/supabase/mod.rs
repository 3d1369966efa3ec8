pub mod auth;
pub mod dto;
pub mod functions;
pub mod rest;
pub mod storage;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::SupabaseConfig;
use crate::error::AppError;

pub use auth::AuthGateway;
pub use rest::SupabaseTaskStore;
pub use storage::ObjectStorage;

/// Shared HTTP plumbing for every Supabase service (PostgREST, GoTrue,
/// Storage, Edge Functions).
#[derive(Clone, Debug)]
pub struct SupabaseHttpClient {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseHttpClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Requests without a user token are sent with the anon key, which the
    /// row-level policy treats as "no user".
    pub(crate) fn request(
        &self,
        method: Method,
        url: &str,
        access_token: Option<&str>,
    ) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.config.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        return Err(backend_error(response).await);
    }

    let body_text = response.text().await?;
    serde_json::from_str::<T>(&body_text).map_err(|e| {
        tracing::error!("Failed to parse backend response: {}", e);
        AppError::Backend {
            status: status.as_u16(),
            message: format!("Failed to parse backend response: {}", e),
        }
    })
}

pub(crate) async fn expect_success(response: Response) -> Result<(), AppError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(backend_error(response).await)
    }
}

pub(crate) async fn backend_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("backend responded {}: {}", status, body);

    match status {
        // PostgREST answers 406 when a single-object request matched no row.
        StatusCode::NOT_ACCEPTABLE | StatusCode::NOT_FOUND => AppError::NotFound,
        StatusCode::UNAUTHORIZED => AppError::Unauthenticated,
        _ => {
            let message = serde_json::from_str::<dto::ErrorBody>(&body)
                .ok()
                .and_then(dto::ErrorBody::into_message)
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    }
                });
            AppError::Backend {
                status: status.as_u16(),
                message,
            }
        }
    }
}
