//! Scan sessions and attendance records repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{
            AttendanceEntry, AttendanceRecord, AttendanceSummaryRow, ManualAttendance, RosterEntry,
            ScanSession, SessionDetails, SubjectDayTotals,
        },
        enums::AttendanceStatus,
        student::Student,
    },
};

const SESSION_DETAILS_SELECT: &str = r#"
    SELECT ss.id, ss.subject_id, ss.start_time, ss.end_time, ss.is_active,
           sub.name AS subject_name, sub.code AS subject_code,
           (SELECT COUNT(*) FROM attendance_records ar
             WHERE ar.subject_id = ss.subject_id
               AND ar.time_in >= ss.start_time
               AND (ss.end_time IS NULL OR ar.time_in <= ss.end_time)) AS total_attendance
    FROM scan_sessions ss
    JOIN subjects sub ON sub.id = ss.subject_id
"#;

const ACTIVE_SESSION_EXISTS: &str = "An active session already exists for this subject";

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: Pool<Postgres>,
}

impl AttendanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Open a scanning window. The subject row is locked so concurrent
    /// starts for the same subject serialize on the active-session check.
    pub async fn start_session(&self, subject_id: i32, now: DateTime<Utc>) -> AppResult<ScanSession> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM subjects WHERE id = $1 FOR UPDATE")
            .bind(subject_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM scan_sessions WHERE subject_id = $1 AND is_active)",
        )
        .bind(subject_id)
        .fetch_one(&mut *tx)
        .await?;

        if active {
            return Err(AppError::Conflict(ACTIVE_SESSION_EXISTS.to_string()));
        }

        let session = sqlx::query_as::<_, ScanSession>(
            r#"
            INSERT INTO scan_sessions (subject_id, start_time, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING *
            "#,
        )
        .bind(subject_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::on_unique_violation(e, ACTIVE_SESSION_EXISTS))?;

        tx.commit().await?;
        Ok(session)
    }

    pub async fn end_session(&self, session_id: i32, now: DateTime<Utc>) -> AppResult<ScanSession> {
        sqlx::query_as::<_, ScanSession>(
            r#"
            UPDATE scan_sessions
            SET end_time = $2, is_active = FALSE
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Active session not found".to_string()))
    }

    pub async fn active_sessions(&self) -> AppResult<Vec<SessionDetails>> {
        let sql = format!("{SESSION_DETAILS_SELECT} WHERE ss.is_active ORDER BY ss.start_time DESC");
        let sessions = sqlx::query_as::<_, SessionDetails>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }

    pub async fn session_details(&self, session_id: i32) -> AppResult<SessionDetails> {
        let sql = format!("{SESSION_DETAILS_SELECT} WHERE ss.id = $1");
        sqlx::query_as::<_, SessionDetails>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Resolve a QR token and mark the student present for `date`.
    /// The active session row stays locked until the record is committed,
    /// so a concurrent `end_session` cannot interleave.
    pub async fn record_scan(
        &self,
        qr_code: &str,
        subject_id: i32,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<(Student, AttendanceRecord)> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>(
            "SELECT id FROM scan_sessions WHERE subject_id = $1 AND is_active FOR UPDATE",
        )
        .bind(subject_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Validation("No active scanning session for this subject".to_string()))?;

        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE qr_code = $1")
            .bind(qr_code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        let record = insert_record(&mut tx, student.id, subject_id, date, now, AttendanceStatus::Present)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Attendance already recorded for this student today".to_string())
            })?;

        tx.commit().await?;
        Ok((student, record))
    }

    /// Backfill or correct attendance for any status and date.
    pub async fn record_manual(&self, entry: &ManualAttendance, now: DateTime<Utc>) -> AppResult<(Student, AttendanceRecord)> {
        let mut tx = self.pool.begin().await?;

        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(entry.student_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        let subject_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)")
            .bind(entry.subject_id)
            .fetch_one(&mut *tx)
            .await?;
        if !subject_exists {
            return Err(AppError::NotFound("Subject not found".to_string()));
        }

        let time_in = entry.time_in.unwrap_or(now);
        let record = insert_record(&mut tx, student.id, entry.subject_id, entry.date, time_in, entry.status)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Attendance already recorded for this student on this date".to_string())
            })?;

        tx.commit().await?;
        Ok((student, record))
    }

    pub async fn update_status(&self, record_id: i32, status: AttendanceStatus) -> AppResult<AttendanceRecord> {
        sqlx::query_as::<_, AttendanceRecord>(
            "UPDATE attendance_records SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(record_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))
    }

    pub async fn update_manual(
        &self,
        record_id: i32,
        status: Option<AttendanceStatus>,
        time_in: Option<DateTime<Utc>>,
    ) -> AppResult<AttendanceRecord> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            UPDATE attendance_records
            SET status = COALESCE($2, status),
                time_in = COALESCE($3, time_in)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(status)
        .bind(time_in)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))
    }

    pub async fn delete(&self, record_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Attendance record not found".to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn by_subject_and_date(&self, subject_id: i32, date: NaiveDate) -> AppResult<Vec<AttendanceEntry>> {
        let entries = sqlx::query_as::<_, AttendanceEntry>(
            r#"
            SELECT ar.id, ar.student_id, ar.subject_id, ar.date, ar.time_in, ar.status,
                   s.student_id AS student_code, s.first_name, s.last_name, s.section
            FROM attendance_records ar
            JOIN students s ON s.id = ar.student_id
            WHERE ar.subject_id = $1 AND ar.date = $2
            ORDER BY ar.time_in
            "#,
        )
        .bind(subject_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn summary(
        &self,
        subject_id: i32,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<AttendanceSummaryRow>> {
        let rows = sqlx::query_as::<_, AttendanceSummaryRow>(
            r#"
            SELECT s.id AS student_id, s.student_id AS student_code, s.first_name, s.last_name,
                   COUNT(ar.id) AS total_days,
                   COUNT(ar.id) FILTER (WHERE ar.status = 'present') AS present_days,
                   COUNT(ar.id) FILTER (WHERE ar.status = 'late') AS late_days,
                   COUNT(ar.id) FILTER (WHERE ar.status = 'absent') AS absent_days
            FROM attendance_records ar
            JOIN students s ON s.id = ar.student_id
            WHERE ar.subject_id = $1
              AND ($2::date IS NULL OR ar.date >= $2)
              AND ($3::date IS NULL OR ar.date <= $3)
            GROUP BY s.id
            ORDER BY s.last_name, s.first_name
            "#,
        )
        .bind(subject_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active enrollments of a subject with their status on `date`
    pub async fn roster(&self, subject_id: i32, date: NaiveDate) -> AppResult<Vec<RosterEntry>> {
        let rows = sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT s.id AS student_id, s.student_id AS student_code, s.first_name, s.last_name, s.section,
                   ar.id AS record_id, ar.time_in,
                   COALESCE(ar.status, 'absent') AS status
            FROM student_subjects e
            JOIN students s ON s.id = e.student_id
            LEFT JOIN attendance_records ar
              ON ar.student_id = s.id AND ar.subject_id = e.subject_id AND ar.date = $2
            WHERE e.subject_id = $1 AND e.is_active
            ORDER BY s.last_name, s.first_name
            "#,
        )
        .bind(subject_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Per-subject counts over an inclusive date range
    pub async fn subject_totals(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<SubjectDayTotals>> {
        let rows = sqlx::query_as::<_, SubjectDayTotals>(
            r#"
            SELECT sub.id AS subject_id, sub.name AS subject_name, sub.code AS subject_code,
                   (SELECT COUNT(*) FROM student_subjects e
                     WHERE e.subject_id = sub.id AND e.is_active) AS enrolled,
                   COUNT(ar.id) FILTER (WHERE ar.status = 'present') AS present,
                   COUNT(ar.id) FILTER (WHERE ar.status = 'late') AS late,
                   COUNT(ar.id) FILTER (WHERE ar.status = 'absent') AS absent
            FROM subjects sub
            LEFT JOIN attendance_records ar
              ON ar.subject_id = sub.id AND ar.date BETWEEN $1 AND $2
            GROUP BY sub.id
            ORDER BY sub.name
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Insert unless a record already exists for (student, subject, date)
async fn insert_record(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    student_id: i32,
    subject_id: i32,
    date: NaiveDate,
    time_in: DateTime<Utc>,
    status: AttendanceStatus,
) -> AppResult<Option<AttendanceRecord>> {
    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        INSERT INTO attendance_records (student_id, subject_id, date, time_in, status)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_id, subject_id, date) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(student_id)
    .bind(subject_id)
    .bind(date)
    .bind(time_in)
    .bind(status)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(record)
}
