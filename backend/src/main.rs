use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskboard::api::router;
use taskboard::config::{AppConfig, StoreBackend};
use taskboard::db::{self, SqliteTaskStore};
use taskboard::generation::{OpenAiClient, SubtaskProxy};
use taskboard::repository::{SubtaskStore, TaskStore};
use taskboard::services::{ProfileService, TaskService};
use taskboard::state::AppState;
use taskboard::supabase::{SupabaseHttpClient, SupabaseTaskStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "taskboard=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    let supabase = SupabaseHttpClient::new(config.supabase.clone())?;

    let (tasks, subtasks) = match config.store {
        StoreBackend::Supabase => stores(Arc::new(SupabaseTaskStore::new(supabase.clone()))),
        StoreBackend::Sqlite => {
            let pool = db::connect(&config.database_url).await?;
            stores(Arc::new(SqliteTaskStore::new(pool)))
        }
    };
    info!("task store: {:?}", config.store);

    let auth = Arc::new(supabase.clone());
    if config.openai.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; subtask generation will fail");
    }
    let completion = Arc::new(OpenAiClient::new(config.openai.clone())?);

    let state = AppState {
        auth: auth.clone(),
        tasks: TaskService::new(tasks, subtasks),
        profile: ProfileService::new(auth.clone(), auth),
        subtask_proxy: Arc::new(SubtaskProxy::new(completion)),
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn stores<S>(store: Arc<S>) -> (Arc<dyn TaskStore>, Arc<dyn SubtaskStore>)
where
    S: TaskStore + SubtaskStore + 'static,
{
    let tasks: Arc<dyn TaskStore> = store.clone();
    let subtasks: Arc<dyn SubtaskStore> = store;
    (tasks, subtasks)
}
