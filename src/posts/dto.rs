use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::posts::repo::Post;
use crate::users::dto::PublicUser;

pub const TITLE_MIN: usize = 1;
pub const TITLE_MAX: usize = 50;
pub const BODY_MAX: usize = 10_000;

fn check_title(title: &str) -> Result<(), ApiError> {
    let len = title.chars().count();
    if len < TITLE_MIN || len > TITLE_MAX {
        return Err(ApiError::Validation(format!(
            "title must be {TITLE_MIN}-{TITLE_MAX} characters"
        )));
    }
    Ok(())
}

fn check_body(body: &str) -> Result<(), ApiError> {
    if body.chars().count() > BODY_MAX {
        return Err(ApiError::Validation(format!(
            "body must be at most {BODY_MAX} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
    pub user_id: Uuid,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_title(&self.title)?;
        check_body(&self.body)
    }
}

/// Any subset of fields; omitted ones keep their stored values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub user_id: Option<Uuid>,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(body) = &self.body {
            check_body(body)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct PublicPost {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Post> for PublicPost {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            body: post.body,
            user_id: post.user_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Post with its owning user attached; user is null when the row cannot
/// be resolved.
#[derive(Debug, Serialize)]
pub struct PostWithUser {
    #[serde(flatten)]
    pub post: PublicPost,
    pub user: Option<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_title_bounds() {
        let mut req = CreatePostRequest {
            title: "Sample Title".into(),
            body: "Sample Body".into(),
            user_id: Uuid::new_v4(),
        };
        assert!(req.validate().is_ok());
        req.title = String::new();
        assert!(req.validate().is_err());
        req.title = "x".repeat(51);
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_body_bound() {
        let mut req = CreatePostRequest {
            title: "Hoge".into(),
            body: "y".repeat(10_000),
            user_id: Uuid::new_v4(),
        };
        assert!(req.validate().is_ok());
        req.body.push('y');
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_omitted_fields_deserialize_to_none() {
        let req: UpdatePostRequest = serde_json::from_str(r#"{"title": "New Title"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("New Title"));
        assert!(req.body.is_none());
        assert!(req.user_id.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn update_request_checks_supplied_fields_only() {
        let req = UpdatePostRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = UpdatePostRequest::default();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn delete_response_shape() {
        let json = serde_json::to_string(&DeleteResponse { ok: true }).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }

    #[test]
    fn post_with_user_flattens_and_nulls_missing_user() {
        let post = Post {
            id: Uuid::new_v4(),
            title: "Hoge".into(),
            body: "HogeHoge".into(),
            user_id: Uuid::new_v4(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let value = serde_json::to_value(PostWithUser {
            post: post.into(),
            user: None,
        })
        .unwrap();
        assert_eq!(value["title"], "Hoge");
        assert!(value["user"].is_null());
    }
}
