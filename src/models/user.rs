//! User account model and the account request/response shapes.

use serde::{Deserialize, Serialize};

use super::Region;
use crate::errors::{AppError, FieldError};

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NICKNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 100;

/// Running ability, used both for crews and as a user's preference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "BEGINNER",
            SkillLevel::Intermediate => "INTERMEDIATE",
            SkillLevel::Advanced => "ADVANCED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BEGINNER" => Some(SkillLevel::Beginner),
            "INTERMEDIATE" => Some(SkillLevel::Intermediate),
            "ADVANCED" => Some(SkillLevel::Advanced),
            _ => None,
        }
    }
}

/// A registered user as stored.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
    pub region_id: Option<String>,
    pub preferred_level: Option<SkillLevel>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
    pub region_id: Option<String>,
    pub preferred_level: Option<SkillLevel>,
}

/// Request body for `POST /auth/signup`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub region_id: Option<String>,
    pub preferred_level: Option<SkillLevel>,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password("password", &self.password, &mut errors);
        check_nickname(&self.nickname, &mut errors);
        into_result(errors)
    }
}

/// Response body for a successful sign-up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub user_id: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "must not be blank"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "must not be blank"));
        }
        into_result(errors)
    }
}

/// Response body for a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
    pub email: String,
    pub nickname: String,
}

/// The signed-in user's own profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub nickname: String,
    pub region: Option<Region>,
    pub preferred_level: Option<SkillLevel>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for `PUT /users/me`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub nickname: String,
    pub region_id: Option<String>,
    pub preferred_level: Option<SkillLevel>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        check_nickname(&self.nickname, &mut errors);
        into_result(errors)
    }
}

/// Request body for `PUT /users/me/password`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.current_password.is_empty() {
            errors.push(FieldError::new("currentPassword", "must not be blank"));
        }
        check_password("newPassword", &self.new_password, &mut errors);
        into_result(errors)
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    let email = email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", "must not be blank"));
    } else if email.len() > MAX_EMAIL_LEN {
        errors.push(FieldError::new(
            "email",
            format!("must be at most {} characters", MAX_EMAIL_LEN),
        ));
    } else if !is_plausible_email(email) {
        errors.push(FieldError::new("email", "must be a well-formed email address"));
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    }
}

fn check_password(field: &str, password: &str, errors: &mut Vec<FieldError>) {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        errors.push(FieldError::new(
            field,
            format!(
                "must be between {} and {} characters",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            ),
        ));
    }
}

fn check_nickname(nickname: &str, errors: &mut Vec<FieldError>) {
    if nickname.trim().is_empty() {
        errors.push(FieldError::new("nickname", "must not be blank"));
    } else if nickname.chars().count() > MAX_NICKNAME_LEN {
        errors.push(FieldError::new(
            "nickname",
            format!("must be at most {} characters", MAX_NICKNAME_LEN),
        ));
    }
}

pub(crate) fn into_result(errors: Vec<FieldError>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid_fields(errors))
    }
}
