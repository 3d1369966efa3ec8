pub mod auth;
pub mod profile;
pub mod tasks;

pub use auth::{AuthChange, AuthEvent, AuthService};
pub use profile::{AvatarUpload, ProfileService};
pub use tasks::{RECENT_TASK_LIMIT, TaskService};
