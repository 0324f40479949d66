//! Email history, delivery statistics and per-user preferences

use axum::extract::{Path, Query, State};

use crate::{
    models::{
        email::{
            BulkEmailPreferences, EmailHistory, EmailHistoryQuery, EmailPreference, EmailStatsQuery,
            EmailTypeStats, QueuedEmails, SetEmailPreference,
        },
        user::Action,
        Page,
    },
    AppState,
};

use super::{ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

#[utoipa::path(
    get,
    path = "/email-management/history",
    tag = "email-management",
    security(("bearer_auth" = [])),
    params(EmailHistoryQuery),
    responses(
        (status = 200, description = "One page of sent and pending emails", body = EmailHistoryPage),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<EmailHistoryQuery>,
) -> ApiResult<Page<EmailHistory>> {
    claims.authorize(Action::ViewEmailLog)?;
    Ok(ApiResponse::ok(state.services.notifications.history(&query).await?))
}

/// Sent/failed/pending counts per email type
#[utoipa::path(
    get,
    path = "/email-management/stats",
    tag = "email-management",
    security(("bearer_auth" = [])),
    params(EmailStatsQuery),
    responses(
        (status = 200, description = "Delivery statistics", body = Vec<EmailTypeStats>),
        (status = 400, description = "days out of range")
    )
)]
pub async fn stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<EmailStatsQuery>,
) -> ApiResult<Vec<EmailTypeStats>> {
    claims.authorize(Action::ViewEmailLog)?;
    Ok(ApiResponse::ok(state.services.notifications.stats(query.days).await?))
}

/// Put a failed email back on the delivery queue
#[utoipa::path(
    post,
    path = "/email-management/history/{id}/retry",
    tag = "email-management",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Email history ID")),
    responses(
        (status = 202, description = "Email re-queued", body = QueuedEmails),
        (status = 404, description = "Email not found"),
        (status = 409, description = "Only failed emails can be retried")
    )
)]
pub async fn retry(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiCreated<QueuedEmails> {
    claims.authorize(Action::SendNotifications)?;
    let id = state.services.notifications.retry(id).await?;
    Ok(ApiResponse::accepted("Email queued for retry", QueuedEmails { queued: vec![id] }))
}

#[utoipa::path(
    get,
    path = "/email-management/preferences",
    tag = "email-management",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's preferences", body = Vec<EmailPreference>)
    )
)]
pub async fn preferences(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<EmailPreference>> {
    claims.authorize(Action::ManageOwnEmailPreferences)?;
    Ok(ApiResponse::ok(state.services.notifications.preferences(claims.user_id).await?))
}

#[utoipa::path(
    put,
    path = "/email-management/preferences",
    tag = "email-management",
    security(("bearer_auth" = [])),
    request_body = SetEmailPreference,
    responses(
        (status = 200, description = "Preference saved", body = EmailPreference)
    )
)]
pub async fn set_preference(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(preference): ValidatedJson<SetEmailPreference>,
) -> ApiResult<EmailPreference> {
    claims.authorize(Action::ManageOwnEmailPreferences)?;
    let saved = state
        .services
        .notifications
        .set_preference(claims.user_id, &preference)
        .await?;
    Ok(ApiResponse::with_message("Email preference updated", saved))
}

#[utoipa::path(
    put,
    path = "/email-management/preferences/bulk",
    tag = "email-management",
    security(("bearer_auth" = [])),
    request_body = BulkEmailPreferences,
    responses(
        (status = 200, description = "Preferences saved", body = Vec<EmailPreference>)
    )
)]
pub async fn set_preferences(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<BulkEmailPreferences>,
) -> ApiResult<Vec<EmailPreference>> {
    claims.authorize(Action::ManageOwnEmailPreferences)?;
    let saved = state
        .services
        .notifications
        .set_preferences(claims.user_id, &request.preferences)
        .await?;
    Ok(ApiResponse::with_message("Email preferences updated", saved))
}
