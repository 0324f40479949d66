//! Scan sessions and attendance records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{enums::AttendanceStatus, student::Student};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScanSession {
    pub id: i32,
    pub subject_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Session joined with its subject
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SessionDetails {
    pub id: i32,
    pub subject_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub subject_name: String,
    pub subject_code: String,
    pub total_attendance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: i32,
    pub student_id: i32,
    pub subject_id: i32,
    pub date: NaiveDate,
    pub time_in: DateTime<Utc>,
    pub status: AttendanceStatus,
}

/// Attendance record joined with the student's identity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceEntry {
    pub id: i32,
    pub student_id: i32,
    pub subject_id: i32,
    pub date: NaiveDate,
    pub time_in: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub section: String,
}

/// Per-student totals over a date range
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceSummaryRow {
    pub student_id: i32,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub total_days: i64,
    pub present_days: i64,
    pub late_days: i64,
    pub absent_days: i64,
}

/// Enrolled student with the day's status, absent when nothing was recorded
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RosterEntry {
    pub student_id: i32,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub section: String,
    pub record_id: Option<i32>,
    pub time_in: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
}

/// Per-subject totals for one day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubjectDayTotals {
    pub subject_id: i32,
    pub subject_name: String,
    pub subject_code: String,
    pub enrolled: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartSession {
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScanRequest {
    #[serde(alias = "qrCode")]
    #[validate(length(min = 1, message = "QR code is required"))]
    pub qr_code: String,
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResult {
    pub student: Student,
    pub attendance: AttendanceRecord,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ManualAttendance {
    #[serde(alias = "studentId")]
    pub student_id: i32,
    #[serde(alias = "subjectId")]
    pub subject_id: i32,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub time_in: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAttendanceStatus {
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateManualAttendance {
    pub status: Option<AttendanceStatus>,
    pub time_in: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RosterQuery {
    /// Defaults to today
    pub date: Option<NaiveDate>,
}
