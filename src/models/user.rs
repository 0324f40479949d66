//! User model, token claims and the role capability table

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

pub use super::enums::Role;

/// Credentialed user as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Library membership attached 1:1 to a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryUser {
    pub id: i32,
    pub user_id: i32,
    pub library_card_number: String,
    pub max_borrow_limit: i32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub password: String,
}

/// Register user request (admin only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePassword {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

/// Update user request (admin only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Operations guarded by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageUsers,
    ViewRoster,
    EditRoster,
    DeleteRoster,
    RunScanning,
    ViewAttendance,
    DeleteAttendance,
    UseLibrary,
    ManageLibrary,
    SendReports,
    SendNotifications,
    ViewEmailLog,
    ManageOwnEmailPreferences,
}

impl Role {
    /// Capability table keyed by (role, action)
    pub fn permits(self, action: Action) -> bool {
        use Action::*;
        use Role::*;

        match action {
            UseLibrary | ManageOwnEmailPreferences => true,
            ManageUsers | DeleteRoster | DeleteAttendance | SendNotifications | ViewEmailLog => {
                self == Admin
            }
            ViewRoster | ViewAttendance => matches!(self, Admin | Teacher | Viewer),
            EditRoster | RunScanning | SendReports => matches!(self, Admin | Teacher),
            ManageLibrary => matches!(self, Admin | Librarian),
        }
    }
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn for_user(user: &User, lifetime_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(lifetime_hours as i64);
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            email: user.email.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token; signature and expiry are both checked
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// The single authorization gate used by every protected handler
    pub fn authorize(&self, action: Action) -> Result<(), AppError> {
        if self.role.permits(action) {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient permissions".to_string()))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: 7,
            username: "mreyes".into(),
            email: "mreyes@school.test".into(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let claims = UserClaims::for_user(&user(Role::Teacher), 24);
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.sub, "mreyes");
        assert_eq!(parsed.role, Role::Teacher);
        assert_eq!(parsed.email, "mreyes@school.test");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = UserClaims::for_user(&user(Role::Admin), 24)
            .create_token("secret")
            .unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = UserClaims::for_user(&user(Role::Admin), 24);
        claims.iat -= 3 * 86_400;
        claims.exp = claims.iat + 3_600;
        let token = claims.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn scanning_is_limited_to_staff() {
        assert!(Role::Admin.permits(Action::RunScanning));
        assert!(Role::Teacher.permits(Action::RunScanning));
        assert!(!Role::Viewer.permits(Action::RunScanning));
        assert!(!Role::Librarian.permits(Action::RunScanning));
    }

    #[test]
    fn library_desk_is_for_librarians_and_admins() {
        assert!(Role::Librarian.permits(Action::ManageLibrary));
        assert!(Role::Admin.permits(Action::ManageLibrary));
        assert!(!Role::Teacher.permits(Action::ManageLibrary));
        for role in Role::ALL {
            assert!(role.permits(Action::UseLibrary));
        }
    }

    #[test]
    fn only_admins_manage_users() {
        for role in Role::ALL {
            assert_eq!(role.permits(Action::ManageUsers), *role == Role::Admin);
        }
    }

    #[test]
    fn viewers_read_but_do_not_write() {
        assert!(Role::Viewer.permits(Action::ViewRoster));
        assert!(Role::Viewer.permits(Action::ViewAttendance));
        assert!(!Role::Viewer.permits(Action::EditRoster));
        assert!(!Role::Viewer.permits(Action::DeleteAttendance));
    }

    #[test]
    fn gate_maps_denial_to_authorization_error() {
        let claims = UserClaims::for_user(&user(Role::Viewer), 1);
        assert!(claims.authorize(Action::ViewRoster).is_ok());
        assert!(matches!(
            claims.authorize(Action::DeleteRoster),
            Err(AppError::Authorization(_))
        ));
    }
}
