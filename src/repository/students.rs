//! Students repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::student::{CreateStudent, Student, UpdateStudent},
};

#[derive(Clone)]
pub struct StudentsRepository {
    pool: Pool<Postgres>,
}

impl StudentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    pub async fn get_by_qr_code(&self, qr_code: &str) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE qr_code = $1")
            .bind(qr_code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    pub async fn list_by_section(&self, section: &str) -> AppResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE section = $1 ORDER BY last_name, first_name",
        )
        .bind(section)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn sections(&self) -> AppResult<Vec<String>> {
        let sections = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT section FROM students ORDER BY section",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sections)
    }

    /// Insert a student whose QR token has already been resolved
    pub async fn create(&self, student: &CreateStudent, qr_code: &str, section: &str) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (student_id, first_name, middle_name, last_name, email, qr_code, section)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&student.student_id)
        .bind(&student.first_name)
        .bind(student.middle_name.as_deref())
        .bind(&student.last_name)
        .bind(&student.email)
        .bind(qr_code)
        .bind(section)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::on_unique_violation(e, "Student with this ID, email or QR code already exists")
        })
    }

    pub async fn update(&self, id: i32, update: &UpdateStudent) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET student_id = COALESCE($2, student_id),
                first_name = COALESCE($3, first_name),
                middle_name = COALESCE($4, middle_name),
                last_name = COALESCE($5, last_name),
                email = COALESCE($6, email),
                section = COALESCE($7, section)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.student_id.as_deref())
        .bind(update.first_name.as_deref())
        .bind(update.middle_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.email.as_deref())
        .bind(update.section.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Student ID or email already in use"))?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        Ok(())
    }
}
