//! Authentication and user administration

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

use crate::{
    config::{AuthConfig, BootstrapAdmin},
    error::{AppError, AppResult},
    models::user::{ChangePassword, RegisterUser, Role, UpdateUser, User, UserClaims},
    repository::{users::NewUser, Repository},
    services::notifications::{Notification, NotificationService},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Verified against when the login identity does not exist, so that an
/// unknown user costs the same hashing work as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("not-a-real-password").ok());

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    default_borrow_limit: i32,
    notifications: NotificationService,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        config: AuthConfig,
        default_borrow_limit: i32,
        notifications: NotificationService,
    ) -> Self {
        Self {
            repository,
            config,
            default_borrow_limit,
            notifications,
        }
    }

    /// Exchange a username (or email) and password for a token
    pub async fn login(&self, identity: &str, password: &str) -> AppResult<(String, User)> {
        let Some(user) = self.repository.users.find_by_identity(identity).await? else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(dummy, password);
            }
            tracing::debug!("Login failed for unknown identity");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&user.password_hash, password)? {
            tracing::debug!("Login failed for user {}", user.id);
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.issue_token(&user)?;
        tracing::info!("User {} logged in", user.username);
        Ok((token, user))
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create a credentialed user together with their library account
    pub async fn register(&self, request: RegisterUser, created_by: Option<i32>) -> AppResult<User> {
        let password_hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(NewUser {
                username: request.username.trim(),
                email: request.email.trim(),
                password_hash: &password_hash,
                role: request.role.unwrap_or_default(),
                borrow_limit: self.default_borrow_limit,
            })
            .await?;

        tracing::info!("Registered user {} with role {}", user.username, user.role);

        let welcome = Notification::Welcome {
            username: user.username.clone(),
            role: user.role,
        };
        if let Err(e) = self.notifications.dispatch(&user.email, &welcome, created_by).await {
            tracing::warn!("Failed to queue welcome email for {}: {}", user.username, e);
        }

        Ok(user)
    }

    pub async fn profile(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    pub async fn change_password(&self, user_id: i32, request: ChangePassword) -> AppResult<()> {
        let user = self.repository.users.get_by_id(user_id).await?;

        if !verify_password(&user.password_hash, &request.current_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let hash = hash_password(&request.new_password)?;
        self.repository.users.update_password(user_id, &hash).await
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn update_user(&self, id: i32, update: UpdateUser) -> AppResult<User> {
        self.repository.users.update(id, &update).await
    }

    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        self.repository.users.update_role(id, role).await
    }

    pub async fn delete_user(&self, id: i32, acting_user_id: i32) -> AppResult<()> {
        if id == acting_user_id {
            return Err(AppError::Validation("You cannot delete your own account".to_string()));
        }
        self.repository.users.delete(id).await
    }

    /// Create the configured administrator when no user exists yet
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<Option<User>> {
        if self.repository.users.count().await? > 0 {
            return Ok(None);
        }

        let password_hash = hash_password(&admin.password)?;
        let user = self
            .repository
            .users
            .create(NewUser {
                username: &admin.username,
                email: &admin.email,
                password_hash: &password_hash,
                role: Role::Admin,
                borrow_limit: self.default_borrow_limit,
            })
            .await?;

        tracing::warn!("Created bootstrap administrator '{}'", user.username);
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "secret123").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn dummy_hash_is_available() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(!verify_password(dummy, "admin123").unwrap());
    }

    #[test]
    fn malformed_hash_is_an_internal_error() {
        assert!(matches!(verify_password("plain", "x"), Err(AppError::Internal(_))));
    }
}
