//! Repository for the `files` table.

use sqlx::PgPool;
use vox_core::types::{DbId, UserId};

use crate::models::file::{CreateFile, StoredFile};

const COLUMNS: &str = "id, name, key, user_id, created_at";

pub struct FileRepo;

impl FileRepo {
    /// Insert a file row. Fails with a unique violation if `key` is taken.
    pub async fn create(pool: &PgPool, input: &CreateFile) -> Result<StoredFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO files (name, key, user_id) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(&input.name)
            .bind(&input.key)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: DbId,
        user_id: UserId,
    ) -> Result<Option<StoredFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Files among `ids` owned by `user_id`, in `ids` order.
    pub async fn find_many_for_user(
        pool: &PgPool,
        ids: &[DbId],
        user_id: UserId,
    ) -> Result<Vec<StoredFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM files \
             WHERE id = ANY($1) AND user_id = $2 \
             ORDER BY array_position($1, id)"
        );
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(ids)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
