//! Repository for the `tasks` table.

use sqlx::PgPool;
use vox_core::status::TaskStatus;
use vox_core::types::{DbId, UserId};

use crate::models::task::{CreateTask, Task};

const COLUMNS: &str = "id, user_id, status_id, handles, results, created_at, updated_at";

/// Tasks are written once at dispatch; only the coarse status changes later.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new task, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (user_id, status_id, handles, results) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.user_id)
            .bind(input.status.map(TaskStatus::id))
            .bind(&input.handles)
            .bind(&input.results)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a task owned by `user_id`; other users' tasks read as absent.
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: DbId,
        user_id: UserId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the coarse status. Returns `false` if no such task exists.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: TaskStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET status_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
