//! Subjects repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::student::{CreateSubject, Subject, UpdateSubject},
};

#[derive(Clone)]
pub struct SubjectsRepository {
    pool: Pool<Postgres>,
}

impl SubjectsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(subjects)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Subject> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))
    }

    pub async fn create(&self, subject: &CreateSubject) -> AppResult<Subject> {
        sqlx::query_as::<_, Subject>(
            "INSERT INTO subjects (name, code, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&subject.name)
        .bind(&subject.code)
        .bind(subject.description.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Subject code already exists"))
    }

    pub async fn update(&self, id: i32, update: &UpdateSubject) -> AppResult<Subject> {
        sqlx::query_as::<_, Subject>(
            r#"
            UPDATE subjects
            SET name = COALESCE($2, name),
                code = COALESCE($3, code),
                description = COALESCE($4, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.code.as_deref())
        .bind(update.description.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Subject code already exists"))?
        .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Subject not found".to_string()));
        }
        Ok(())
    }
}
