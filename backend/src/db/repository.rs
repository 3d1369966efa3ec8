use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    NewSubtaskRequest, NewTaskRequest, Subtask, Task, TaskQuery, TaskStatus, UpdateSubtaskRequest,
    UpdateTaskRequest,
};

const TASK_COLUMNS: &str =
    "id, user_id, title, description, due_date, status, priority, created_at, updated_at";
const SUBTASK_COLUMNS: &str = "id, task_id, user_id, title, status, created_at, updated_at";

pub async fn fetch_tasks(
    db: &SqlitePool,
    user_id: &str,
    query: &TaskQuery,
) -> Result<Vec<Task>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM tasks WHERE user_id = ", TASK_COLUMNS));
    builder.push_bind(user_id.to_string());

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = query.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }

    // rowid breaks ties between rows created within the same instant
    builder.push(" ORDER BY created_at DESC, rowid DESC");

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }

    builder.build_query_as::<Task>().fetch_all(db).await
}

pub async fn find_task_by_id(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = ? AND user_id = ?",
        TASK_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_task(
    db: &SqlitePool,
    user_id: &str,
    req: &NewTaskRequest,
) -> Result<Task, sqlx::Error> {
    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: req.title.clone(),
        description: req.description.clone(),
        due_date: req.due_date,
        status: req.status.unwrap_or_default(),
        priority: req.priority.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO tasks
            (id, user_id, title, description, due_date, status, priority, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task.id)
    .bind(&task.user_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.due_date)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(db)
    .await?;

    Ok(task)
}

pub async fn update_task(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
    req: UpdateTaskRequest,
) -> Result<Option<Task>, sqlx::Error> {
    let mut current = match find_task_by_id(db, user_id, id).await? {
        Some(task) => task,
        None => return Ok(None),
    };

    req.apply_to(&mut current);
    current.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?,
            description = ?,
            due_date = ?,
            status = ?,
            priority = ?,
            updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.due_date)
    .bind(current.status)
    .bind(current.priority)
    .bind(current.updated_at)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_task(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Task>, sqlx::Error> {
    let existing = match find_task_by_id(db, user_id, id).await? {
        Some(task) => task,
        None => return Ok(None),
    };

    sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(Some(existing))
}

pub async fn fetch_task_statuses(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<TaskStatus>, sqlx::Error> {
    sqlx::query_scalar::<_, TaskStatus>("SELECT status FROM tasks WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(db)
        .await
}

pub async fn fetch_subtasks(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<Vec<Subtask>, sqlx::Error> {
    sqlx::query_as::<_, Subtask>(&format!(
        "SELECT {} FROM subtasks WHERE task_id = ? AND user_id = ? ORDER BY created_at ASC, rowid ASC",
        SUBTASK_COLUMNS
    ))
    .bind(task_id)
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_subtask_by_id(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Subtask>, sqlx::Error> {
    sqlx::query_as::<_, Subtask>(&format!(
        "SELECT {} FROM subtasks WHERE id = ? AND user_id = ?",
        SUBTASK_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_subtask(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
    req: &NewSubtaskRequest,
) -> Result<Subtask, sqlx::Error> {
    let now = Utc::now();
    let subtask = Subtask {
        id: Uuid::new_v4().to_string(),
        task_id: task_id.to_string(),
        user_id: user_id.to_string(),
        title: req.title.clone(),
        status: req.status.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO subtasks (id, task_id, user_id, title, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&subtask.id)
    .bind(&subtask.task_id)
    .bind(&subtask.user_id)
    .bind(&subtask.title)
    .bind(subtask.status)
    .bind(subtask.created_at)
    .bind(subtask.updated_at)
    .execute(db)
    .await?;

    Ok(subtask)
}

pub async fn update_subtask(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
    req: UpdateSubtaskRequest,
) -> Result<Option<Subtask>, sqlx::Error> {
    let mut current = match find_subtask_by_id(db, user_id, id).await? {
        Some(subtask) => subtask,
        None => return Ok(None),
    };

    req.apply_to(&mut current);
    current.updated_at = Utc::now();

    sqlx::query(
        "UPDATE subtasks SET title = ?, status = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(&current.title)
    .bind(current.status)
    .bind(current.updated_at)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_subtask(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Subtask>, sqlx::Error> {
    let existing = match find_subtask_by_id(db, user_id, id).await? {
        Some(subtask) => subtask,
        None => return Ok(None),
    };

    sqlx::query("DELETE FROM subtasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(Some(existing))
}
