#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use taskboard::db::{self, SqliteTaskStore};
use taskboard::error::AppError;
use taskboard::generation::{GenerationError, SubtaskGenerator};
use taskboard::models::*;
use taskboard::repository::{SubtaskStore, TaskStore};
use taskboard::services::{ProfileService, TaskService};
use taskboard::supabase::{AuthGateway, ObjectStorage};

pub const PASSWORD: &str = "correct horse battery staple";

pub fn token_for(user_id: &str) -> String {
    format!("token-{}", user_id)
}

pub fn session_for(user_id: &str) -> Session {
    Session {
        access_token: token_for(user_id),
        token_type: "bearer".to_string(),
        expires_in: Some(3600),
        refresh_token: None,
        user: User {
            id: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
            user_metadata: UserMetadata::default(),
        },
    }
}

/// Identity provider with one password for everybody and `token-<id>` tokens.
#[derive(Default)]
pub struct FakeAuth {
    users: Mutex<HashMap<String, User>>,
    pub confirm_sign_ups: bool,
    pub sign_outs: AtomicUsize,
}

impl FakeAuth {
    pub fn with_user(id: &str, full_name: &str) -> Self {
        let auth = FakeAuth::default();
        auth.users.lock().unwrap().insert(
            id.to_string(),
            User {
                id: id.to_string(),
                email: Some(format!("{}@example.com", id)),
                user_metadata: UserMetadata {
                    full_name: Some(full_name.to_string()),
                    avatar_url: None,
                },
            },
        );
        auth
    }

    /// Sign-ups wait for email confirmation instead of returning a session.
    pub fn confirming() -> Self {
        FakeAuth {
            confirm_sign_ups: true,
            ..FakeAuth::default()
        }
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(id).cloned()
    }

    fn user_for_token(&self, token: &str) -> Result<User, AppError> {
        let id = token.strip_prefix("token-").ok_or(AppError::Unauthenticated)?;
        self.user(id).ok_or(AppError::Unauthenticated)
    }

    fn session(&self, user: User) -> Session {
        Session {
            access_token: token_for(&user.id),
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: Some("refresh".to_string()),
            user,
        }
    }
}

#[async_trait]
impl AuthGateway for FakeAuth {
    async fn sign_up(&self, req: &SignUpRequest) -> Result<SignUpOutcome, AppError> {
        let id = req.email.split('@').next().unwrap_or_default().to_string();
        let user = User {
            id: id.clone(),
            email: Some(req.email.clone()),
            user_metadata: UserMetadata {
                full_name: Some(req.full_name.clone()),
                avatar_url: None,
            },
        };
        self.users.lock().unwrap().insert(id, user.clone());

        if self.confirm_sign_ups {
            Ok(SignUpOutcome::ConfirmationRequired { user })
        } else {
            Ok(SignUpOutcome::SignedIn { session: self.session(user) })
        }
    }

    async fn sign_in(&self, req: &SignInRequest) -> Result<Session, AppError> {
        let user = self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|user| user.email.as_deref() == Some(req.email.as_str()))
            .cloned();
        match user {
            Some(user) if req.password == PASSWORD => Ok(self.session(user)),
            _ => Err(AppError::Backend {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.user_for_token(access_token)?;
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        self.user_for_token(access_token)
    }

    async fn update_user(&self, access_token: &str, update: &ProfileUpdate) -> Result<User, AppError> {
        let id = self.user_for_token(access_token)?.id;
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AppError::Unauthenticated)?;
        user.user_metadata.merge(update);
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        _access_token: &str,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, path), (content_type.to_string(), bytes));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://storage.test/{}/{}", bucket, path)
    }
}

pub enum CannedGenerator {
    Titles(Vec<&'static str>),
    Fails,
}

#[async_trait]
impl SubtaskGenerator for CannedGenerator {
    async fn generate(&self, access_token: Option<&str>, _task_title: &str) -> Result<Vec<String>, AppError> {
        assert!(access_token.is_some());
        match self {
            CannedGenerator::Titles(titles) => Ok(titles.iter().map(|t| t.to_string()).collect()),
            CannedGenerator::Fails => Err(GenerationError::NotAnArray.into()),
        }
    }
}

/// Wraps a store and counts every call that reaches it.
pub struct CountingStore {
    inner: SqliteTaskStore,
    pub calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskStore for CountingStore {
    async fn list_tasks(&self, session: &Session, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        self.hit();
        self.inner.list_tasks(session, query).await
    }

    async fn create_task(&self, session: &Session, req: &NewTaskRequest) -> Result<Task, AppError> {
        self.hit();
        self.inner.create_task(session, req).await
    }

    async fn update_task(&self, session: &Session, id: &str, patch: &UpdateTaskRequest) -> Result<Task, AppError> {
        self.hit();
        self.inner.update_task(session, id, patch).await
    }

    async fn delete_task(&self, session: &Session, id: &str) -> Result<Task, AppError> {
        self.hit();
        self.inner.delete_task(session, id).await
    }

    async fn task_statuses(&self, session: &Session) -> Result<Vec<TaskStatus>, AppError> {
        self.hit();
        self.inner.task_statuses(session).await
    }
}

#[async_trait]
impl SubtaskStore for CountingStore {
    async fn list_subtasks(&self, session: &Session, task_id: &str) -> Result<Vec<Subtask>, AppError> {
        self.hit();
        self.inner.list_subtasks(session, task_id).await
    }

    async fn create_subtask(&self, session: &Session, task_id: &str, req: &NewSubtaskRequest) -> Result<Subtask, AppError> {
        self.hit();
        self.inner.create_subtask(session, task_id, req).await
    }

    async fn update_subtask(&self, session: &Session, id: &str, patch: &UpdateSubtaskRequest) -> Result<Subtask, AppError> {
        self.hit();
        self.inner.update_subtask(session, id, patch).await
    }

    async fn delete_subtask(&self, session: &Session, id: &str) -> Result<Subtask, AppError> {
        self.hit();
        self.inner.delete_subtask(session, id).await
    }
}

pub async fn counting_store() -> Arc<CountingStore> {
    let pool = db::connect_in_memory().await.expect("Failed to create test db");
    Arc::new(CountingStore {
        inner: SqliteTaskStore::new(pool),
        calls: AtomicUsize::new(0),
    })
}

pub fn task_service(store: Arc<CountingStore>) -> TaskService {
    TaskService::new(store.clone(), store)
}

pub fn profile_service(auth: Arc<FakeAuth>, storage: Arc<MemoryStorage>) -> ProfileService {
    ProfileService::new(auth, storage)
}
