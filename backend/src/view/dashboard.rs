use std::sync::Arc;

use tracing::{error, info};

use crate::error::AppError;
use crate::generation::{GenerationError, SubtaskGenerator};
use crate::models::{
    NewSubtaskRequest, ProfileUpdate, Session, SignInRequest, SignUpOutcome, SignUpRequest,
};
use crate::services::{AuthService, AvatarUpload, ProfileService, RECENT_TASK_LIMIT, TaskService};
use crate::view::{Page, TaskForm, ViewState};

/// Drives [`ViewState`] from user actions. Failures never propagate: they are
/// logged, put in the banner, and the rest of the state is left as it was.
pub struct Dashboard {
    auth: Arc<AuthService>,
    tasks: TaskService,
    profile: ProfileService,
    generator: Arc<dyn SubtaskGenerator>,
    state: ViewState,
}

impl Dashboard {
    pub fn new(
        auth: Arc<AuthService>,
        tasks: TaskService,
        profile: ProfileService,
        generator: Arc<dyn SubtaskGenerator>,
    ) -> Self {
        Self {
            auth,
            tasks,
            profile,
            generator,
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn dismiss_banner(&mut self) {
        self.state.banner = None;
        self.state.notice = None;
    }

    pub async fn navigate(&mut self, page: Page) {
        if page.requires_session() && self.auth.session().await.is_none() {
            self.state.page = Page::Login;
            return;
        }

        self.state.page = page;
        if page == Page::Dashboard {
            self.refresh().await;
        }
    }

    pub async fn sign_up(&mut self, req: SignUpRequest) {
        match self.auth.sign_up(req).await {
            Ok(SignUpOutcome::SignedIn { session }) => {
                self.state.user = Some(session.user);
                self.navigate(Page::Dashboard).await;
            }
            Ok(SignUpOutcome::ConfirmationRequired { user }) => {
                info!("sign-up for {} awaits confirmation", user.id);
                self.state.notice =
                    Some("Check your email to confirm your account, then sign in.".to_string());
                self.state.page = Page::Login;
            }
            Err(e) => self.fail("sign up", e),
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) {
        let req = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.auth.sign_in(req).await {
            Ok(session) => {
                self.state.user = Some(session.user);
                self.state.banner = None;
                self.navigate(Page::Dashboard).await;
            }
            Err(e) => self.fail("sign in", e),
        }
    }

    /// Local state is cleared even if the provider call fails.
    pub async fn sign_out(&mut self) {
        let result = self.auth.sign_out().await;
        self.state = ViewState::default();
        if let Err(e) = result {
            self.fail("sign out", e);
        }
    }

    pub async fn refresh(&mut self) {
        let Some(session) = self.session().await else {
            return;
        };

        let loaded = async {
            let tasks = self.tasks.list_tasks(&session).await?;
            let recent = self.tasks.list_recent_tasks(&session, RECENT_TASK_LIMIT).await?;
            let stats = self.tasks.task_stats(&session).await?;
            Ok::<_, AppError>((tasks, recent, stats))
        }
        .await;

        match loaded {
            Ok((tasks, recent, stats)) => {
                self.state
                    .subtasks
                    .retain(|task_id, _| tasks.iter().any(|task| &task.id == task_id));
                self.state.tasks = tasks;
                self.state.recent_tasks = recent;
                self.state.stats = stats;
            }
            Err(e) => self.fail("load tasks", e),
        }
    }

    pub fn open_task_form(&mut self) {
        self.state.form = Some(TaskForm::default());
    }

    pub fn edit_task(&mut self, id: &str) {
        match self.state.task(id).map(TaskForm::for_task) {
            Some(form) => self.state.form = Some(form),
            None => self.fail("edit task", AppError::NotFound),
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        self.state.form.as_mut()
    }

    pub fn cancel_form(&mut self) {
        self.state.form = None;
    }

    /// Creates or updates depending on whether the form edits an existing task.
    /// The form stays open on failure.
    pub async fn submit_task_form(&mut self) {
        let Some(form) = self.state.form.clone() else {
            return;
        };
        let session = self.auth.session().await;

        let result = match &form.editing {
            Some(id) => match session.as_ref() {
                Some(session) => self
                    .tasks
                    .update_task(session, id, form.to_update_request())
                    .await
                    .map(|_| ()),
                None => Err(AppError::Unauthenticated),
            },
            None => self
                .tasks
                .create_task(session.as_ref(), form.to_new_request())
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.state.form = None;
                self.refresh().await;
            }
            Err(e) => self.fail("save task", e),
        }
    }

    pub async fn toggle_task(&mut self, id: &str) {
        let Some(current) = self.state.task(id).map(|task| task.status) else {
            self.fail("toggle task", AppError::NotFound);
            return;
        };
        let Some(session) = self.session().await else {
            return;
        };

        match self.tasks.toggle_task_status(&session, id, current).await {
            Ok(_) => self.refresh().await,
            Err(e) => self.fail("toggle task", e),
        }
    }

    pub async fn delete_task(&mut self, id: &str) {
        let Some(session) = self.session().await else {
            return;
        };

        match self.tasks.delete_task(&session, id).await {
            Ok(_) => {
                self.state.subtasks.remove(id);
                self.refresh().await;
            }
            Err(e) => self.fail("delete task", e),
        }
    }

    pub async fn load_subtasks(&mut self, task_id: &str) {
        let Some(session) = self.session().await else {
            return;
        };

        match self.tasks.list_subtasks(&session, task_id).await {
            Ok(subtasks) => {
                self.state.subtasks.insert(task_id.to_string(), subtasks);
            }
            Err(e) => self.fail("load subtasks", e),
        }
    }

    pub async fn add_subtask(&mut self, task_id: &str, title: &str) {
        let Some(session) = self.session().await else {
            return;
        };

        match self
            .tasks
            .create_subtask(&session, task_id, NewSubtaskRequest::new(title.trim()))
            .await
        {
            Ok(subtask) => self
                .state
                .subtasks
                .entry(task_id.to_string())
                .or_default()
                .push(subtask),
            Err(e) => self.fail("add subtask", e),
        }
    }

    pub async fn toggle_subtask(&mut self, task_id: &str, id: &str) {
        let Some(current) = self.state.subtask(task_id, id).map(|subtask| subtask.status) else {
            self.fail("toggle subtask", AppError::NotFound);
            return;
        };
        let Some(session) = self.session().await else {
            return;
        };

        match self.tasks.toggle_subtask_status(&session, id, current).await {
            Ok(updated) => {
                if let Some(slot) = self
                    .state
                    .subtasks
                    .get_mut(task_id)
                    .and_then(|subtasks| subtasks.iter_mut().find(|s| s.id == id))
                {
                    *slot = updated;
                }
            }
            Err(e) => self.fail("toggle subtask", e),
        }
    }

    pub async fn delete_subtask(&mut self, task_id: &str, id: &str) {
        let Some(session) = self.session().await else {
            return;
        };

        match self.tasks.delete_subtask(&session, id).await {
            Ok(_) => {
                if let Some(subtasks) = self.state.subtasks.get_mut(task_id) {
                    subtasks.retain(|subtask| subtask.id != id);
                }
            }
            Err(e) => self.fail("delete subtask", e),
        }
    }

    /// Asks the generator for subtask titles and stores each one, in order,
    /// under the task.
    pub async fn generate_subtasks(&mut self, task_id: &str) {
        let Some(title) = self.state.task(task_id).map(|task| task.title.clone()) else {
            self.fail("generate subtasks", AppError::NotFound);
            return;
        };
        let Some(session) = self.session().await else {
            return;
        };

        self.state.generating = Some(task_id.to_string());
        let result = self.create_generated(&session, task_id, &title).await;
        self.state.generating = None;

        match result {
            Ok(count) => info!("added {} generated subtasks to {}", count, task_id),
            Err(e) => self.fail("generate subtasks", e),
        }
        // an insert may have failed after others landed
        self.load_subtasks(task_id).await;
    }

    async fn create_generated(
        &self,
        session: &Session,
        task_id: &str,
        title: &str,
    ) -> Result<usize, AppError> {
        let titles = self
            .generator
            .generate(Some(&session.access_token), title)
            .await?;

        // Nothing is stored unless every title is usable.
        if let Some(index) = titles.iter().position(|t| t.trim().is_empty()) {
            return Err(GenerationError::BlankSubtask(index).into());
        }

        let count = titles.len();
        for subtask_title in titles {
            self.tasks
                .create_subtask(session, task_id, NewSubtaskRequest::new(subtask_title))
                .await?;
        }
        Ok(count)
    }

    pub async fn save_profile(&mut self, update: ProfileUpdate) {
        let Some(session) = self.session().await else {
            return;
        };

        match self.profile.update_profile(&session, update).await {
            Ok(user) => {
                self.auth.replace_user(user.clone()).await;
                self.state.user = Some(user);
            }
            Err(e) => self.fail("save profile", e),
        }
    }

    pub async fn change_avatar(&mut self, upload: AvatarUpload) {
        let Some(session) = self.session().await else {
            return;
        };

        match self.profile.change_avatar(&session, upload).await {
            Ok(user) => {
                self.auth.replace_user(user.clone()).await;
                self.state.user = Some(user);
            }
            Err(e) => self.fail("change avatar", e),
        }
    }

    /// Current session, or a trip to the login page.
    async fn session(&mut self) -> Option<Session> {
        let session = self.auth.session().await;
        if session.is_none() {
            self.state.page = Page::Login;
            self.fail("load session", AppError::Unauthenticated);
        }
        session
    }

    fn fail(&mut self, action: &str, err: AppError) {
        error!("{} failed: {}", action, err);
        self.state.banner = Some(err.user_message());
    }
}
