use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;

use crate::error::AppError;
use crate::supabase::{SupabaseHttpClient, expect_success};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[async_trait]
impl ObjectStorage for SupabaseHttpClient {
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        let url = self.config().storage_object_url(bucket, path);
        let response = self
            .request(Method::POST, &url, Some(access_token))
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .body(bytes)
            .send()
            .await?;

        expect_success(response).await?;
        tracing::info!("uploaded {} to bucket {}", path, bucket);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.config().storage_public_url(bucket, path)
    }
}
