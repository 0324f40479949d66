//! API handlers for the campus REST endpoints

pub mod auth;
pub mod email;
pub mod email_management;
pub mod enrollments;
pub mod health;
pub mod library;
pub mod openapi;
pub mod scan;
pub mod students;
pub mod subjects;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Access token required".to_string()))?;

        // Signature and expiry are both checked
        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// JSON body that is deserialized and then validated
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::Validation(rejection.body_text()))?;
        value.validate().map_err(validation_message)?;
        Ok(ValidatedJson(value))
    }
}

/// First human-readable message out of a validator report
fn validation_message(errors: validator::ValidationErrors) -> AppError {
    let message = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_string());
    AppError::Validation(message)
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data,
        })
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Self::with_message(message, data))
    }

    pub fn accepted(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::ACCEPTED, Self::with_message(message, data))
    }
}

/// Envelope for operations that only report success
pub fn done(message: impl Into<String>) -> Json<ApiResponse<()>> {
    ApiResponse::with_message(message, ())
}

/// Fallback for paths no route matches
pub async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
pub type ApiCreated<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, serde::Deserialize, Validate)]
    struct Signup {
        #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
        username: String,
    }

    #[test]
    fn validation_uses_the_declared_message() {
        let errors = Signup { username: "ab".into() }.validate().unwrap_err();
        match validation_message(errors) {
            AppError::Validation(msg) => assert_eq!(msg, "Username must be at least 3 characters"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn envelope_omits_missing_message() {
        let Json(body) = ApiResponse::ok(5);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "data": 5 }));
    }
}
