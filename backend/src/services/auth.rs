use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Session, SignInRequest, SignUpOutcome, SignUpRequest, User};
use crate::supabase::AuthGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    UserUpdated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub change: AuthChange,
    pub session: Option<Session>,
}

/// Client-side session holder. Subscribers to [`AuthService::on_auth_state_change`]
/// see every sign-in, sign-out and user update.
pub struct AuthService {
    gateway: Arc<dyn AuthGateway>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            gateway,
            session: RwLock::new(None),
            events,
        }
    }

    pub fn gateway(&self) -> Arc<dyn AuthGateway> {
        self.gateway.clone()
    }

    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn sign_up(&self, req: SignUpRequest) -> Result<SignUpOutcome, AppError> {
        req.validate()?;

        let outcome = self.gateway.sign_up(&req).await?;
        if let SignUpOutcome::SignedIn { session } = &outcome {
            self.set_session(Some(session.clone()), AuthChange::SignedIn).await;
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, req: SignInRequest) -> Result<Session, AppError> {
        req.validate()?;

        let session = self.gateway.sign_in(&req).await?;
        info!("signed in {}", session.user_id());
        self.set_session(Some(session.clone()), AuthChange::SignedIn).await;
        Ok(session)
    }

    /// The local session is dropped even when the provider call fails.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let previous = self.session.read().await.clone();
        let result = match &previous {
            Some(session) => self.gateway.sign_out(&session.access_token).await,
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!("sign-out request failed: {}", e);
        }

        self.set_session(None, AuthChange::SignedOut).await;
        result
    }

    /// Asks the provider who the current token belongs to.
    pub async fn current_user(&self) -> Result<Option<User>, AppError> {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => return Ok(None),
        };

        match self.gateway.get_user(&token).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replaces the user on the held session after a profile change.
    pub async fn replace_user(&self, user: User) {
        let updated = {
            let mut guard = self.session.write().await;
            match guard.as_mut() {
                Some(session) => {
                    session.user = user;
                    Some(session.clone())
                }
                None => None,
            }
        };

        if updated.is_some() {
            self.emit(AuthChange::UserUpdated, updated);
        }
    }

    async fn set_session(&self, session: Option<Session>, change: AuthChange) {
        *self.session.write().await = session.clone();
        self.emit(change, session);
    }

    fn emit(&self, change: AuthChange, session: Option<Session>) {
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent { change, session });
    }
}
