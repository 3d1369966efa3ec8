use std::env;
use std::net::SocketAddr;

use crate::error::AppError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub functions_url: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        let functions_url = format!("{}/functions/v1", url);
        Self {
            url,
            anon_key: anon_key.into(),
            functions_url,
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| AppError::Config("SUPABASE_URL is not set".to_string()))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| AppError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;

        let mut config = Self::new(url, anon_key);
        if let Ok(functions_url) = env::var("SUPABASE_FUNCTIONS_URL") {
            config.functions_url = functions_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    pub fn storage_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, bucket, path)
    }

    pub fn storage_public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, bucket, path)
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/{}", self.functions_url, name)
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Missing keys surface at generation time, not at startup.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn new_from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|key| !key.trim().is_empty());
        let base_url = env::var("OPENAI_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());

        Self {
            api_key,
            base_url,
            model,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Sqlite,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(AppError::Config(format!("unknown TASK_STORE: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub supabase: SupabaseConfig,
    pub openai: OpenAiConfig,
    pub store: StoreBackend,
    pub database_url: String,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let supabase = SupabaseConfig::new_from_env()?;
        let openai = OpenAiConfig::new_from_env();

        let store = match env::var("TASK_STORE") {
            Ok(value) => StoreBackend::parse(&value)?,
            Err(_) => StoreBackend::Supabase,
        };

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://taskboard.db?mode=rwc".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("invalid BIND_ADDR: {}", e)))?;

        Ok(Self {
            supabase,
            openai,
            store,
            database_url,
            bind_addr,
        })
    }
}
