pub mod subtask;
pub mod task;
pub mod user;

pub use subtask::{NewSubtaskRequest, Subtask, UpdateSubtaskRequest};
pub use task::{NewTaskRequest, Priority, Task, TaskQuery, TaskStats, TaskStatus, UpdateTaskRequest};
pub use user::{
    ProfileUpdate, Session, SignInRequest, SignUpOutcome, SignUpRequest, User, UserMetadata,
};
