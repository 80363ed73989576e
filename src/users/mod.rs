//! User accounts: sign-up, credential checks, profile and password changes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::crew::Directory;
use crate::errors::{codes, AppError};
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, NewUser, SignUpRequest, SkillLevel,
    UpdateProfileRequest, User, UserProfile,
};

/// Account persistence on top of the shared user/region lookups.
#[async_trait]
pub trait UserStore: Directory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a user and return its id. A taken email is a unique violation.
    async fn insert_user(&self, user: &NewUser) -> Result<String, AppError>;

    async fn update_profile(
        &self,
        user_id: &str,
        nickname: &str,
        region_id: Option<&str>,
        preferred_level: Option<SkillLevel>,
    ) -> Result<(), AppError>;

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), AppError>;
}

pub struct UserService<S> {
    store: Arc<S>,
    bcrypt_cost: u32,
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: Arc<S>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<String, AppError> {
        let email = normalize_email(&request.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(duplicated_email());
        }
        let region_id = self.check_region(request.region_id.as_deref()).await?;

        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;
        let new_user = NewUser {
            email,
            password_hash,
            nickname: request.nickname.trim().to_string(),
            region_id,
            preferred_level: request.preferred_level,
        };

        let user_id = match self.store.insert_user(&new_user).await {
            Ok(id) => id,
            Err(AppError::UniqueViolation(_)) => return Err(duplicated_email()),
            Err(e) => return Err(e),
        };

        tracing::info!(user_id = %user_id, "User signed up");
        Ok(user_id)
    }

    /// Check credentials. Unknown email and wrong password look the same to the caller.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse, AppError> {
        let email = normalize_email(&request.email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::debug!("Login attempt for unknown email");
            return Err(AppError::authentication_failed());
        };

        if !verify_password(&request.password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AppError::authentication_failed());
        }

        Ok(LoginResponse {
            user_id: user.id,
            email: user.email,
            nickname: user.nickname,
        })
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        let user = self.require_user(user_id).await?;
        let region = match &user.region_id {
            Some(region_id) => self.store.find_region(region_id).await?,
            None => None,
        };

        Ok(UserProfile {
            id: user.id,
            email: user.email,
            nickname: user.nickname,
            region,
            preferred_level: user.preferred_level,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, AppError> {
        self.require_user(user_id).await?;
        let region_id = self.check_region(request.region_id.as_deref()).await?;

        self.store
            .update_profile(
                user_id,
                request.nickname.trim(),
                region_id.as_deref(),
                request.preferred_level,
            )
            .await?;

        self.profile(user_id).await
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let user = self.require_user(user_id).await?;
        if !verify_password(&request.current_password, &user.password_hash).await? {
            return Err(AppError::password_mismatch());
        }

        let password_hash = hash_password(request.new_password, self.bcrypt_cost).await?;
        self.store.update_password(user_id, &password_hash).await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    async fn require_user(&self, user_id: &str) -> Result<User, AppError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::user_not_found(user_id))
    }

    /// Blank ids count as "no region"; anything else must exist.
    async fn check_region(&self, region_id: Option<&str>) -> Result<Option<String>, AppError> {
        match region_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => match self.store.find_region(id).await? {
                Some(region) => Ok(Some(region.id)),
                None => Err(AppError::region_not_found(id)),
            },
            None => Ok(None),
        }
    }
}

/// Runs on the blocking pool so slow hashes do not stall the runtime.
async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {}", e)))?
        .map_err(AppError::from)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn duplicated_email() -> AppError {
    AppError::Conflict {
        code: codes::DUPLICATED_EMAIL,
        message: "Email is already registered".to_string(),
    }
}
