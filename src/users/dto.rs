use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::posts::dto::PublicPost;
use crate::users::repo::User;

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 32;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= EMAIL_MAX && EMAIL_RE.is_match(email)
}

fn check_name(name: &str) -> Result<(), ApiError> {
    let len = name.chars().count();
    if len < NAME_MIN || len > NAME_MAX {
        return Err(ApiError::Validation(format!(
            "name must be {NAME_MIN}-{NAME_MAX} characters"
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) {
        return Err(ApiError::Validation("email is not a valid address".into()));
    }
    Ok(())
}

fn check_provider(provider: &str) -> Result<(), ApiError> {
    if provider.is_empty() {
        return Err(ApiError::Validation("provider must not be empty".into()));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN || len > PASSWORD_MAX {
        return Err(ApiError::Validation(format!(
            "password must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

/// Request body for credential registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub provider: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl RegisterRequest {
    /// Structural validation, run before any business logic.
    pub fn validate(&self) -> Result<(), ApiError> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_provider(&self.provider)?;
        check_password(&self.password)?;
        if self.password_confirmation != self.password {
            return Err(ApiError::Validation("passwords do not match".into()));
        }
        Ok(())
    }
}

/// Request body for OAuth provision-or-fetch. No password is supplied;
/// a random one is generated server-side on first provision.
#[derive(Debug, Deserialize)]
pub struct OAuthRequest {
    pub name: String,
    pub email: String,
    pub provider: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl OAuthRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_provider(&self.provider)
    }
}

/// Request body for credential login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub provider: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_email(&self.email)?;
        check_provider(&self.provider)
    }
}

/// Optional query filter for GET /users.
#[derive(Debug, Deserialize)]
pub struct UserFilter {
    pub email: Option<String>,
    pub provider: Option<String>,
}

/// Public part of a user returned to the client. Never carries the digest.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub provider: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            provider: user.provider,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithPosts {
    #[serde(flatten)]
    pub user: PublicUser,
    pub posts: Vec<PublicPost>,
}

/// GET /users returns a single user when filtered by (email, provider),
/// otherwise the full listing with nested posts.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UsersResponse {
    One(PublicUser),
    Many(Vec<UserWithPosts>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            name: "hoge".into(),
            email: "hoge@example.com".into(),
            password: "hogehoge".into(),
            password_confirmation: "hogehoge".into(),
            provider: "credentials".into(),
            image: Some("hoge.png".into()),
        }
    }

    #[test]
    fn valid_register_request_passes() {
        assert!(register_request().validate().is_ok());
    }

    #[test]
    fn name_bounds_are_enforced() {
        let mut req = register_request();
        req.name = "a".into();
        assert!(req.validate().is_err());
        req.name = "ab".into();
        assert!(req.validate().is_ok());
        req.name = "x".repeat(50);
        assert!(req.validate().is_ok());
        req.name = "x".repeat(51);
        assert!(req.validate().is_err());
    }

    #[test]
    fn email_syntax_is_checked() {
        let mut req = register_request();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());
        req.email = "a@b".into();
        assert!(req.validate().is_err());
        req.email = format!("{}@example.com", "a".repeat(250));
        assert!(req.validate().is_err());
    }

    #[test]
    fn password_confirmation_must_match() {
        let mut req = register_request();
        req.password_confirmation = "different1".into();
        let err = req.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn password_bounds_are_enforced() {
        let mut req = register_request();
        req.password = "short".into();
        req.password_confirmation = "short".into();
        assert!(req.validate().is_err());
        req.password = "x".repeat(33);
        req.password_confirmation = req.password.clone();
        assert!(req.validate().is_err());
    }

    #[test]
    fn oauth_request_needs_no_password() {
        let req = OAuthRequest {
            name: "hoge".into(),
            email: "hoge@example.com".into(),
            provider: "google".into(),
            image: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn public_user_json_has_no_digest() {
        let user = User {
            id: Uuid::new_v4(),
            name: "hoge".into(),
            email: "hoge@example.com".into(),
            image: None,
            provider: "credentials".into(),
            password_digest: "$argon2id$super-secret".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("password_digest"));
        assert!(!json.contains("super-secret"));
        assert!(json.contains("hoge@example.com"));
    }

    #[test]
    fn users_response_shapes_differ() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            name: "hoge".into(),
            email: "hoge@example.com".into(),
            image: None,
            provider: "credentials".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let one = serde_json::to_value(UsersResponse::One(user)).unwrap();
        assert!(one.is_object());
        let many = serde_json::to_value(UsersResponse::Many(vec![])).unwrap();
        assert!(many.is_array());
    }

    #[test]
    fn filter_deserializes_partial_params() {
        let filter: UserFilter =
            serde_json::from_str(r#"{"email": "hoge@example.com"}"#).unwrap();
        assert_eq!(filter.email.as_deref(), Some("hoge@example.com"));
        assert!(filter.provider.is_none());
    }
}
