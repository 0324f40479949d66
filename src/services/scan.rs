//! Scanning sessions and attendance recording

use chrono::{NaiveDate, Utc};

use crate::{
    config::SchedulerConfig,
    error::{AppError, AppResult},
    models::{
        attendance::{
            AttendanceEntry, AttendanceRecord, AttendanceSummaryRow, ManualAttendance, RosterEntry,
            ScanResult, ScanSession, SessionDetails, SubjectDayTotals, UpdateManualAttendance,
        },
        enums::AttendanceStatus,
        student::Student,
    },
    repository::Repository,
    services::notifications::{Notification, NotificationService},
};

#[derive(Clone)]
pub struct ScanService {
    repository: Repository,
    clock: SchedulerConfig,
    notifications: NotificationService,
}

impl ScanService {
    pub fn new(repository: Repository, clock: SchedulerConfig, notifications: NotificationService) -> Self {
        Self {
            repository,
            clock,
            notifications,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.local_date(Utc::now())
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    pub async fn start_session(&self, subject_id: i32) -> AppResult<ScanSession> {
        let session = self.repository.attendance.start_session(subject_id, Utc::now()).await?;
        tracing::info!("Scan session {} started for subject {}", session.id, subject_id);
        Ok(session)
    }

    pub async fn end_session(&self, session_id: i32) -> AppResult<ScanSession> {
        let session = self.repository.attendance.end_session(session_id, Utc::now()).await?;
        tracing::info!("Scan session {} ended", session.id);
        Ok(session)
    }

    pub async fn active_sessions(&self) -> AppResult<Vec<SessionDetails>> {
        self.repository.attendance.active_sessions().await
    }

    pub async fn session(&self, session_id: i32) -> AppResult<SessionDetails> {
        self.repository.attendance.session_details(session_id).await
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Mark the student behind `qr_code` present in `subject_id` today.
    /// The confirmation email is queued only after the record commits.
    pub async fn scan(&self, qr_code: &str, subject_id: i32, scanned_by: i32) -> AppResult<ScanResult> {
        let qr_code = qr_code.trim();
        if qr_code.is_empty() {
            return Err(AppError::Validation("QR code is required".to_string()));
        }

        let now = Utc::now();
        let (student, attendance) = self
            .repository
            .attendance
            .record_scan(qr_code, subject_id, self.clock.local_date(now), now)
            .await?;

        tracing::info!(
            "Student {} marked present in subject {}",
            student.student_id,
            subject_id
        );

        self.confirm(&student, &attendance, scanned_by).await;
        Ok(ScanResult { student, attendance })
    }

    pub async fn record_manual(&self, entry: ManualAttendance, recorded_by: i32) -> AppResult<ScanResult> {
        let (student, attendance) = self.repository.attendance.record_manual(&entry, Utc::now()).await?;
        tracing::info!(
            "Manual attendance for student {} in subject {} on {}: {}",
            student.student_id,
            entry.subject_id,
            entry.date,
            attendance.status
        );

        self.confirm(&student, &attendance, recorded_by).await;
        Ok(ScanResult { student, attendance })
    }

    /// Best effort: failures are logged, never returned
    async fn confirm(&self, student: &Student, record: &AttendanceRecord, sent_by: i32) {
        let subject = match self.repository.subjects.get_by_id(record.subject_id).await {
            Ok(subject) => subject,
            Err(e) => {
                tracing::warn!("Skipping attendance confirmation for {}: {}", student.student_id, e);
                return;
            }
        };

        let notification = Notification::AttendanceConfirmation {
            student_name: student.full_name(),
            subject_name: subject.name,
            subject_code: subject.code,
            date: record.date,
            time_in: record.time_in,
            status: record.status,
        };

        if let Err(e) = self
            .notifications
            .dispatch(&student.email, &notification, Some(sent_by))
            .await
        {
            tracing::warn!("Failed to queue attendance confirmation for {}: {}", student.student_id, e);
        }
    }

    pub async fn update_status(&self, record_id: i32, status: AttendanceStatus) -> AppResult<AttendanceRecord> {
        self.repository.attendance.update_status(record_id, status).await
    }

    pub async fn update_manual(&self, record_id: i32, update: UpdateManualAttendance) -> AppResult<AttendanceRecord> {
        if update.status.is_none() && update.time_in.is_none() {
            return Err(AppError::Validation("Nothing to update".to_string()));
        }
        self.repository
            .attendance
            .update_manual(record_id, update.status, update.time_in)
            .await
    }

    pub async fn delete_record(&self, record_id: i32) -> AppResult<()> {
        self.repository.attendance.delete(record_id).await?;
        tracing::info!("Attendance record {} deleted", record_id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn by_subject_and_date(&self, subject_id: i32, date: NaiveDate) -> AppResult<Vec<AttendanceEntry>> {
        self.repository.attendance.by_subject_and_date(subject_id, date).await
    }

    pub async fn summary(
        &self,
        subject_id: i32,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<AttendanceSummaryRow>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::Validation("start_date must not be after end_date".to_string()));
            }
        }
        self.repository.attendance.summary(subject_id, start, end).await
    }

    pub async fn roster(&self, subject_id: i32, date: Option<NaiveDate>) -> AppResult<Vec<RosterEntry>> {
        self.repository.subjects.get_by_id(subject_id).await?;
        let date = date.unwrap_or_else(|| self.today());
        self.repository.attendance.roster(subject_id, date).await
    }

    pub async fn today_totals(&self) -> AppResult<Vec<SubjectDayTotals>> {
        let today = self.today();
        self.repository.attendance.subject_totals(today, today).await
    }
}
