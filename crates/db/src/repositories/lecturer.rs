use claimflow_core::domain::lecturer::{Lecturer, LecturerId};

use super::{LecturerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLecturerRepository {
    pool: DbPool,
}

impl SqlLecturerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LecturerRepository for SqlLecturerRepository {
    async fn find_by_id(&self, id: &LecturerId) -> Result<Option<Lecturer>, RepositoryError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT id, display_name FROM lecturer WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, display_name)| Lecturer { id: LecturerId(id), display_name }))
    }

    async fn save(&self, lecturer: Lecturer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lecturer (id, display_name) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
        )
        .bind(&lecturer.id.0)
        .bind(&lecturer.display_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
