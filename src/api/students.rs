//! Student roster endpoints

use axum::extract::{Path, State};

use crate::{
    models::{
        student::{CreateStudent, Student, UpdateStudent},
        user::Action,
    },
    AppState,
};

use super::{done, ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

/// List all students ordered by name
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All students", body = Vec<Student>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<Student>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.list_students().await?))
}

#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Student> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.get_student(id).await?))
}

/// Resolve a QR token to its student
#[utoipa::path(
    get,
    path = "/students/qr/{qr_code}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("qr_code" = String, Path, description = "QR token printed on the student card")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student_by_qr(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(qr_code): Path<String>,
) -> ApiResult<Student> {
    claims.authorize(Action::RunScanning)?;
    Ok(ApiResponse::ok(state.services.roster.find_by_qr_code(&qr_code).await?))
}

#[utoipa::path(
    get,
    path = "/students/section/{section}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("section" = String, Path, description = "Section name")),
    responses(
        (status = 200, description = "Students of the section", body = Vec<Student>)
    )
)]
pub async fn students_in_section(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(section): Path<String>,
) -> ApiResult<Vec<Student>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.students_in_section(&section).await?))
}

#[utoipa::path(
    get,
    path = "/students/sections",
    tag = "students",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Distinct section names", body = Vec<String>)
    )
)]
pub async fn list_sections(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<String>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.sections().await?))
}

/// Create a student; a QR token is generated when none is supplied
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Student ID or email already exists")
    )
)]
pub async fn create_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(student): ValidatedJson<CreateStudent>,
) -> ApiCreated<Student> {
    claims.authorize(Action::EditRoster)?;
    let student = state.services.roster.create_student(student).await?;
    Ok(ApiResponse::created("Student created successfully", student))
}

#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Student ID or email already exists")
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(update): ValidatedJson<UpdateStudent>,
) -> ApiResult<Student> {
    claims.authorize(Action::EditRoster)?;
    let student = state.services.roster.update_student(id, update).await?;
    Ok(ApiResponse::with_message("Student updated successfully", student))
}

#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    claims.authorize(Action::DeleteRoster)?;
    state.services.roster.delete_student(id).await?;
    Ok(done("Student deleted successfully"))
}
