//! Attendance scanning endpoints

use axum::extract::{Path, Query, State};
use chrono::NaiveDate;

use crate::{
    models::{
        attendance::{
            AttendanceEntry, AttendanceRecord, AttendanceSummaryRow, DateRangeQuery, ManualAttendance,
            RosterEntry, RosterQuery, ScanRequest, ScanResult, ScanSession, SessionDetails, StartSession,
            SubjectDayTotals, UpdateAttendanceStatus, UpdateManualAttendance,
        },
        user::Action,
    },
    AppState,
};

use super::{done, ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Open the scanning window for a subject
#[utoipa::path(
    post,
    path = "/scan/session/start",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = StartSession,
    responses(
        (status = 201, description = "Session started", body = ScanSession),
        (status = 404, description = "Subject not found"),
        (status = 409, description = "A session is already active for this subject")
    )
)]
pub async fn start_session(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<StartSession>,
) -> ApiCreated<ScanSession> {
    claims.authorize(Action::RunScanning)?;
    let session = state.services.scan.start_session(request.subject_id).await?;
    Ok(ApiResponse::created("Scan session started", session))
}

#[utoipa::path(
    put,
    path = "/scan/session/end/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session ended", body = ScanSession),
        (status = 404, description = "Active session not found")
    )
)]
pub async fn end_session(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<ScanSession> {
    claims.authorize(Action::RunScanning)?;
    let session = state.services.scan.end_session(id).await?;
    Ok(ApiResponse::with_message("Scan session ended", session))
}

#[utoipa::path(
    get,
    path = "/scan/session/active",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active sessions", body = Vec<SessionDetails>)
    )
)]
pub async fn active_sessions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<SessionDetails>> {
    claims.authorize(Action::ViewAttendance)?;
    Ok(ApiResponse::ok(state.services.scan.active_sessions().await?))
}

#[utoipa::path(
    get,
    path = "/scan/session/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session with attendance count", body = SessionDetails),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<SessionDetails> {
    claims.authorize(Action::ViewAttendance)?;
    Ok(ApiResponse::ok(state.services.scan.session(id).await?))
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Record attendance from a scanned QR code
#[utoipa::path(
    post,
    path = "/scan/scan",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = ScanResult),
        (status = 400, description = "No active session for this subject"),
        (status = 404, description = "Invalid QR code"),
        (status = 409, description = "Attendance already recorded today")
    )
)]
pub async fn scan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ScanRequest>,
) -> ApiResult<ScanResult> {
    claims.authorize(Action::RunScanning)?;
    let result = state
        .services
        .scan
        .scan(&request.qr_code, request.subject_id, claims.user_id)
        .await?;
    Ok(ApiResponse::with_message("Attendance recorded successfully", result))
}

#[utoipa::path(
    post,
    path = "/scan/attendance/manual",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = ManualAttendance,
    responses(
        (status = 200, description = "Attendance recorded", body = ScanResult),
        (status = 404, description = "Student or subject not found")
    )
)]
pub async fn record_manual(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(entry): ValidatedJson<ManualAttendance>,
) -> ApiResult<ScanResult> {
    claims.authorize(Action::RunScanning)?;
    let result = state.services.scan.record_manual(entry, claims.user_id).await?;
    Ok(ApiResponse::with_message("Attendance recorded successfully", result))
}

#[utoipa::path(
    put,
    path = "/scan/attendance/manual/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Attendance record ID")),
    request_body = UpdateManualAttendance,
    responses(
        (status = 200, description = "Attendance updated", body = AttendanceRecord),
        (status = 400, description = "Nothing to update"),
        (status = 404, description = "Attendance record not found")
    )
)]
pub async fn update_manual(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(update): ValidatedJson<UpdateManualAttendance>,
) -> ApiResult<AttendanceRecord> {
    claims.authorize(Action::RunScanning)?;
    let record = state.services.scan.update_manual(id, update).await?;
    Ok(ApiResponse::with_message("Attendance updated successfully", record))
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/scan/attendance/{id}/{date}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Subject ID"),
        ("date" = String, Path, description = "Day (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Attendance of the day", body = Vec<AttendanceEntry>)
    )
)]
pub async fn attendance_by_date(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, date)): Path<(i32, NaiveDate)>,
) -> ApiResult<Vec<AttendanceEntry>> {
    claims.authorize(Action::ViewAttendance)?;
    Ok(ApiResponse::ok(state.services.scan.by_subject_and_date(id, date).await?))
}

/// Per-student present/late/absent counts over an optional date range
#[utoipa::path(
    get,
    path = "/scan/attendance/summary/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Subject ID"), DateRangeQuery),
    responses(
        (status = 200, description = "Attendance summary", body = Vec<AttendanceSummaryRow>),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn attendance_summary(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Vec<AttendanceSummaryRow>> {
    claims.authorize(Action::ViewAttendance)?;
    let rows = state
        .services
        .scan
        .summary(id, range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok(rows))
}

#[utoipa::path(
    put,
    path = "/scan/attendance/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Attendance record ID")),
    request_body = UpdateAttendanceStatus,
    responses(
        (status = 200, description = "Status updated", body = AttendanceRecord),
        (status = 404, description = "Attendance record not found")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateAttendanceStatus>,
) -> ApiResult<AttendanceRecord> {
    claims.authorize(Action::RunScanning)?;
    let record = state.services.scan.update_status(id, request.status).await?;
    Ok(ApiResponse::with_message("Attendance status updated", record))
}

#[utoipa::path(
    delete,
    path = "/scan/attendance/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Attendance record deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Attendance record not found")
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    claims.authorize(Action::DeleteAttendance)?;
    state.services.scan.delete_record(id).await?;
    Ok(done("Attendance record deleted successfully"))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Enrolled students with their status for one day (absent when unrecorded)
#[utoipa::path(
    get,
    path = "/scan/students/{id}",
    tag = "scan",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Subject ID"), RosterQuery),
    responses(
        (status = 200, description = "Roster with attendance status", body = Vec<RosterEntry>),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn subject_roster(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<RosterQuery>,
) -> ApiResult<Vec<RosterEntry>> {
    claims.authorize(Action::ViewAttendance)?;
    Ok(ApiResponse::ok(state.services.scan.roster(id, query.date).await?))
}

#[utoipa::path(
    get,
    path = "/scan/today",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Per-subject totals for today", body = Vec<SubjectDayTotals>)
    )
)]
pub async fn today(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<SubjectDayTotals>> {
    claims.authorize(Action::ViewAttendance)?;
    Ok(ApiResponse::ok(state.services.scan.today_totals().await?))
}
