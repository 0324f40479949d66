//! Subject endpoints

use axum::extract::{Path, State};

use crate::{
    models::{
        student::{CreateSubject, Subject, UpdateSubject},
        user::Action,
    },
    AppState,
};

use super::{done, ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

#[utoipa::path(
    get,
    path = "/subjects",
    tag = "subjects",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All subjects", body = Vec<Subject>)
    )
)]
pub async fn list_subjects(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<Subject>> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.list_subjects().await?))
}

#[utoipa::path(
    get,
    path = "/subjects/{id}",
    tag = "subjects",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn get_subject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<Subject> {
    claims.authorize(Action::ViewRoster)?;
    Ok(ApiResponse::ok(state.services.roster.get_subject(id).await?))
}

#[utoipa::path(
    post,
    path = "/subjects",
    tag = "subjects",
    security(("bearer_auth" = [])),
    request_body = CreateSubject,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 409, description = "Subject code already exists")
    )
)]
pub async fn create_subject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(subject): ValidatedJson<CreateSubject>,
) -> ApiCreated<Subject> {
    claims.authorize(Action::EditRoster)?;
    let subject = state.services.roster.create_subject(subject).await?;
    Ok(ApiResponse::created("Subject created successfully", subject))
}

#[utoipa::path(
    put,
    path = "/subjects/{id}",
    tag = "subjects",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Subject ID")),
    request_body = UpdateSubject,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 404, description = "Subject not found"),
        (status = 409, description = "Subject code already exists")
    )
)]
pub async fn update_subject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(update): ValidatedJson<UpdateSubject>,
) -> ApiResult<Subject> {
    claims.authorize(Action::EditRoster)?;
    let subject = state.services.roster.update_subject(id, update).await?;
    Ok(ApiResponse::with_message("Subject updated successfully", subject))
}

#[utoipa::path(
    delete,
    path = "/subjects/{id}",
    tag = "subjects",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject deleted"),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn delete_subject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    claims.authorize(Action::DeleteRoster)?;
    state.services.roster.delete_subject(id).await?;
    Ok(done("Subject deleted successfully"))
}
