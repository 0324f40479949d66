//! Email trigger endpoints. Sends are queued; responses carry the history ids.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{
        email::{
            AttendanceReportRequest, DailySummaryRequest, DigestRequest, NotificationRequest, QueuedEmails,
            SubjectReportRequest,
        },
        user::Action,
    },
    AppState,
};

use super::{ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

#[derive(Serialize, ToSchema)]
pub struct ConnectionStatus {
    pub connected: bool,
}

fn queued(ids: Vec<i32>) -> ApiCreated<QueuedEmails> {
    let message = format!("{} email(s) queued", ids.len());
    Ok(ApiResponse::accepted(message, QueuedEmails { queued: ids }))
}

/// Check SMTP connectivity
#[utoipa::path(
    post,
    path = "/email/test",
    tag = "email",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "SMTP server reachable", body = ConnectionStatus),
        (status = 500, description = "SMTP server unreachable")
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<ConnectionStatus> {
    claims.authorize(Action::SendNotifications)?;
    let connected = state.services.notifications.check_connection().await?;
    if !connected {
        return Err(AppError::Internal("SMTP server did not accept the connection".to_string()));
    }
    Ok(ApiResponse::with_message("SMTP connection OK", ConnectionStatus { connected }))
}

/// Send one subject's attendance for a day to an address
#[utoipa::path(
    post,
    path = "/email/attendance-report",
    tag = "email",
    security(("bearer_auth" = [])),
    request_body = AttendanceReportRequest,
    responses(
        (status = 202, description = "Report queued", body = QueuedEmails),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn attendance_report(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<AttendanceReportRequest>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendReports)?;
    let id = state
        .services
        .reports
        .send_attendance_report(request.subject_id, request.date, &request.recipient_email, claims.user_id)
        .await?;
    queued(vec![id])
}

#[utoipa::path(
    post,
    path = "/email/daily-summary",
    tag = "email",
    security(("bearer_auth" = [])),
    request_body = DailySummaryRequest,
    responses(
        (status = 202, description = "Summary queued", body = QueuedEmails)
    )
)]
pub async fn daily_summary(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<DailySummaryRequest>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendReports)?;
    let id = state
        .services
        .reports
        .send_daily_summary(request.date, &request.recipient_email, claims.user_id)
        .await?;
    queued(vec![id])
}

/// Free-form message to one address
#[utoipa::path(
    post,
    path = "/email/notification",
    tag = "email",
    security(("bearer_auth" = [])),
    request_body = NotificationRequest,
    responses(
        (status = 202, description = "Notification queued", body = QueuedEmails),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn notification(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<NotificationRequest>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendNotifications)?;
    let id = state.services.reports.send_notification(request, claims.user_id).await?;
    queued(vec![id])
}

/// Daily digest to every subscriber, now
#[utoipa::path(
    post,
    path = "/email/send-daily-summary",
    tag = "email",
    security(("bearer_auth" = [])),
    request_body = DigestRequest,
    responses(
        (status = 202, description = "Digests queued", body = QueuedEmails)
    )
)]
pub async fn send_daily_digest(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    request: Option<Json<DigestRequest>>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendNotifications)?;
    let date = request.and_then(|Json(r)| r.date);
    let ids = state
        .services
        .reports
        .send_daily_digest(date, Some(claims.user_id))
        .await?;
    queued(ids)
}

/// Weekly digest (seven days ending on `date`) to weekly subscribers, now
#[utoipa::path(
    post,
    path = "/email/send-weekly-summary",
    tag = "email",
    security(("bearer_auth" = [])),
    request_body = DigestRequest,
    responses(
        (status = 202, description = "Digests queued", body = QueuedEmails)
    )
)]
pub async fn send_weekly_digest(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    request: Option<Json<DigestRequest>>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendNotifications)?;
    let end = request.and_then(|Json(r)| r.date);
    let ids = state
        .services
        .reports
        .send_weekly_digest(end, Some(claims.user_id))
        .await?;
    queued(ids)
}

#[utoipa::path(
    post,
    path = "/email/send-subject-report",
    tag = "email",
    security(("bearer_auth" = [])),
    request_body = SubjectReportRequest,
    responses(
        (status = 202, description = "Reports queued", body = QueuedEmails),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn send_subject_report(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<SubjectReportRequest>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendReports)?;
    let ids = state
        .services
        .reports
        .send_subject_report(request.subject_id, request.date, claims.user_id)
        .await?;
    queued(ids)
}
