//! Authentication and user administration endpoints

use axum::extract::{Path, State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::user::{Action, ChangePassword, LoginRequest, RegisterUser, UpdateRole, UpdateUser, User},
    AppState,
};

use super::{done, ApiCreated, ApiResponse, ApiResult, AuthenticatedUser, ValidatedJson};

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub user: User,
}

/// Exchange credentials for a token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (token, user) = state
        .services
        .auth
        .login(request.username.trim(), &request.password)
        .await?;

    Ok(ApiResponse::with_message("Login successful", LoginResponse { token, user }))
}

/// Create a credentialed user (admin only)
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<RegisterUser>,
) -> ApiCreated<User> {
    claims.authorize(Action::ManageUsers)?;

    let user = state.services.auth.register(request, Some(claims.user_id)).await?;
    Ok(ApiResponse::created("User registered successfully", user))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<User> {
    let user = state.services.auth.profile(claims.user_id).await?;
    Ok(ApiResponse::ok(user))
}

#[utoipa::path(
    put,
    path = "/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ChangePassword>,
) -> ApiResult<()> {
    state.services.auth.change_password(claims.user_id, request).await?;
    Ok(done("Password changed successfully"))
}

#[utoipa::path(
    get,
    path = "/auth/users",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<User>> {
    claims.authorize(Action::ManageUsers)?;
    Ok(ApiResponse::ok(state.services.auth.list_users().await?))
}

#[utoipa::path(
    get,
    path = "/auth/users/{id}",
    tag = "auth",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<User> {
    claims.authorize(Action::ManageUsers)?;
    Ok(ApiResponse::ok(state.services.auth.get_user(id).await?))
}

#[utoipa::path(
    put,
    path = "/auth/users/{id}",
    tag = "auth",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(update): ValidatedJson<UpdateUser>,
) -> ApiResult<User> {
    claims.authorize(Action::ManageUsers)?;
    let user = state.services.auth.update_user(id, update).await?;
    Ok(ApiResponse::with_message("User updated successfully", user))
}

#[utoipa::path(
    put,
    path = "/auth/users/{id}/role",
    tag = "auth",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateRole>,
) -> ApiResult<User> {
    claims.authorize(Action::ManageUsers)?;
    let user = state.services.auth.update_role(id, request.role).await?;
    Ok(ApiResponse::with_message("User role updated successfully", user))
}

#[utoipa::path(
    delete,
    path = "/auth/users/{id}",
    tag = "auth",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    claims.authorize(Action::ManageUsers)?;
    state.services.auth.delete_user(id, claims.user_id).await?;
    Ok(done("User deleted successfully"))
}
