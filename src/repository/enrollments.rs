//! Enrollments (student_subjects) repository

use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::student::{BulkEnrollmentResult, Enrollment, EnrollmentDetails},
};

const DETAILS_SELECT: &str = r#"
    SELECT e.id, e.student_id, e.subject_id, e.enrollment_date, e.is_active,
           s.student_id AS student_code, s.first_name, s.last_name, s.section,
           sub.name AS subject_name, sub.code AS subject_code
    FROM student_subjects e
    JOIN students s ON s.id = e.student_id
    JOIN subjects sub ON sub.id = e.subject_id
"#;

#[derive(Clone)]
pub struct EnrollmentsRepository {
    pool: Pool<Postgres>,
}

impl EnrollmentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<EnrollmentDetails>> {
        let sql = format!("{DETAILS_SELECT} ORDER BY sub.name, s.last_name, s.first_name");
        let rows = sqlx::query_as::<_, EnrollmentDetails>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_by_student(&self, student_id: i32) -> AppResult<Vec<EnrollmentDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE e.student_id = $1 ORDER BY sub.name");
        let rows = sqlx::query_as::<_, EnrollmentDetails>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_by_subject(&self, subject_id: i32) -> AppResult<Vec<EnrollmentDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE e.subject_id = $1 ORDER BY s.last_name, s.first_name");
        let rows = sqlx::query_as::<_, EnrollmentDetails>(&sql)
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn enroll(&self, student_id: i32, subject_id: i32) -> AppResult<Enrollment> {
        let mut tx = self.pool.begin().await?;

        ensure_exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)", student_id, "Student not found").await?;
        ensure_exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)", subject_id, "Subject not found").await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO student_subjects (student_id, subject_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(subject_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Student is already enrolled in this subject"))?;

        tx.commit().await?;
        Ok(enrollment)
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> AppResult<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE student_subjects
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM student_subjects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Enrollment not found".to_string()));
        }
        Ok(())
    }

    /// Enroll many students in one subject; all or nothing.
    /// Pairs that already exist are reported as skipped.
    pub async fn bulk_enroll(&self, student_ids: &[i32], subject_id: i32) -> AppResult<BulkEnrollmentResult> {
        let mut tx = self.pool.begin().await?;

        ensure_exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)", subject_id, "Subject not found").await?;

        let found: HashSet<i32> = sqlx::query_scalar::<_, i32>("SELECT id FROM students WHERE id = ANY($1)")
            .bind(student_ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

        let missing: Vec<String> = student_ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::NotFound(format!("Students not found: {}", missing.join(", "))));
        }

        let mut enrolled = Vec::with_capacity(student_ids.len());
        let mut skipped = Vec::new();
        for &student_id in student_ids {
            let inserted = sqlx::query_as::<_, Enrollment>(
                r#"
                INSERT INTO student_subjects (student_id, subject_id)
                VALUES ($1, $2)
                ON CONFLICT (student_id, subject_id) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(student_id)
            .bind(subject_id)
            .fetch_optional(&mut *tx)
            .await?;

            match inserted {
                Some(enrollment) => enrolled.push(enrollment),
                None => skipped.push(student_id),
            }
        }

        tx.commit().await?;
        Ok(BulkEnrollmentResult { enrolled, skipped })
    }
}

async fn ensure_exists(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    sql: &str,
    id: i32,
    message: &str,
) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(sql).bind(id).fetch_one(&mut **tx).await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(message.to_string()))
    }
}
