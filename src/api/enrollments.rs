//! Enrollment endpoints

use axum::extract::{Path, State};

use crate::{
    models::{
        student::{
            BulkEnrollment, BulkEnrollmentResult, CreateEnrollment, Enrollment, EnrollmentDetails,
            SetEnrollmentActive,
        },
        user::Action,
    },
    AppState,
};

use super::{done, ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

#[utoipa::path(
    get,
    path = "/enrollments",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All enrollments", body = Vec<EnrollmentDetails>)
    )
)]
pub async fn list_enrollments(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<EnrollmentDetails>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.list_enrollments().await?))
}

#[utoipa::path(
    get,
    path = "/enrollments/student/{id}",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Subjects the student is enrolled in", body = Vec<EnrollmentDetails>)
    )
)]
pub async fn enrollments_of_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Vec<EnrollmentDetails>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.enrollments_of_student(id).await?))
}

#[utoipa::path(
    get,
    path = "/enrollments/subject/{id}",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Students enrolled in the subject", body = Vec<EnrollmentDetails>)
    )
)]
pub async fn enrollments_of_subject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Vec<EnrollmentDetails>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.enrollments_of_subject(id).await?))
}

#[utoipa::path(
    post,
    path = "/enrollments",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    request_body = CreateEnrollment,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 404, description = "Student or subject not found"),
        (status = 409, description = "Already enrolled")
    )
)]
pub async fn enroll(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateEnrollment>,
) -> ApiCreated<Enrollment> {
    claims.authorize(Action::EditRoster)?;
    let enrollment = state
        .services
        .roster
        .enroll(request.student_id, request.subject_id)
        .await?;
    Ok(ApiResponse::created("Student enrolled successfully", enrollment))
}

/// Activate or deactivate an enrollment
#[utoipa::path(
    put,
    path = "/enrollments/{id}",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Enrollment ID")),
    request_body = SetEnrollmentActive,
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 404, description = "Enrollment not found")
    )
)]
pub async fn set_enrollment_active(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<SetEnrollmentActive>,
) -> ApiResult<Enrollment> {
    claims.authorize(Action::EditRoster)?;
    let enrollment = state
        .services
        .roster
        .set_enrollment_active(id, request.is_active)
        .await?;
    Ok(ApiResponse::with_message("Enrollment updated successfully", enrollment))
}

#[utoipa::path(
    delete,
    path = "/enrollments/{id}",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment removed"),
        (status = 404, description = "Enrollment not found")
    )
)]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    claims.authorize(Action::DeleteRoster)?;
    state.services.roster.delete_enrollment(id).await?;
    Ok(done("Enrollment removed successfully"))
}

/// Enroll many students in one subject; existing pairs are skipped
#[utoipa::path(
    post,
    path = "/enrollments/bulk",
    tag = "enrollments",
    security(("bearer_auth" = [])),
    request_body = BulkEnrollment,
    responses(
        (status = 201, description = "Students enrolled", body = BulkEnrollmentResult),
        (status = 404, description = "Student or subject not found")
    )
)]
pub async fn bulk_enroll(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<BulkEnrollment>,
) -> ApiCreated<BulkEnrollmentResult> {
    claims.authorize(Action::EditRoster)?;
    let result = state
        .services
        .roster
        .bulk_enroll(&request.student_ids, request.subject_id)
        .await?;
    let message = format!("{} students enrolled", result.enrolled.len());
    Ok(ApiResponse::created(message, result))
}
