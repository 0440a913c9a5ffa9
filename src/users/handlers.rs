use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    posts::{dto::PublicPost, repo::Post},
    state::AppState,
    users::{
        dto::{
            LoginRequest, OAuthRequest, PublicUser, RegisterRequest, UserFilter, UserWithPosts,
            UsersResponse,
        },
        password::{generate_random_password, hash_password, verify_password},
        repo::{NewUser, User},
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/oauth", post(oauth))
        .route("/users", post(register).get(list_users))
        .route("/sessions", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    payload.validate()?;

    if User::find_by_email_provider(&state.db, &payload.email, &payload.provider)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, provider = %payload.provider, "already registered");
        return Err(ApiError::Conflict("user already registered".into()));
    }

    let digest = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            name: &payload.name,
            email: &payload.email,
            image: payload.image.as_deref(),
            provider: &payload.provider,
            password_digest: &digest,
        },
    )
    .await?;

    info!(user_id = %user.id, provider = %user.provider, "user registered");
    Ok(Json(user.into()))
}

/// OAuth login and OAuth signup are the same operation: return the existing
/// user for (email, provider) or provision one with a random placeholder
/// password. Repeat calls change nothing.
#[instrument(skip(state, payload))]
pub async fn oauth(
    State(state): State<AppState>,
    Json(payload): Json<OAuthRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    payload.validate()?;

    if let Some(user) =
        User::find_by_email_provider(&state.db, &payload.email, &payload.provider).await?
    {
        return Ok(Json(user.into()));
    }

    let digest = hash_password(&generate_random_password())?;
    let created = User::create(
        &state.db,
        NewUser {
            name: &payload.name,
            email: &payload.email,
            image: payload.image.as_deref(),
            provider: &payload.provider,
            password_digest: &digest,
        },
    )
    .await;

    let user = match created {
        Ok(user) => {
            info!(user_id = %user.id, provider = %user.provider, "oauth user provisioned");
            user
        }
        // Lost a provisioning race; the winner's row is the answer.
        Err(e) if is_unique_violation(&e) => {
            User::find_by_email_provider(&state.db, &payload.email, &payload.provider)
                .await?
                .ok_or_else(|| {
                    ApiError::Internal(anyhow::anyhow!("user vanished after unique conflict"))
                })?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    payload.validate()?;

    // One generic failure for both unknown user and wrong password.
    let Some(user) =
        User::find_by_email_provider(&state.db, &payload.email, &payload.provider).await?
    else {
        warn!(provider = %payload.provider, "login for unknown user");
        return Err(ApiError::Unauthorized);
    };

    if !verify_password(&payload.password, &user.password_digest) {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Unauthorized);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<UsersResponse>, ApiError> {
    // Exactly-one semantics when both filters are present; a miss is an
    // error, not an empty list.
    if let (Some(email), Some(provider)) = (&filter.email, &filter.provider) {
        let user = User::find_by_email_provider(&state.db, email, provider)
            .await?
            .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
        return Ok(Json(UsersResponse::One(user.into())));
    }

    let users = User::list_all(&state.db).await?;
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut posts_by_user: HashMap<Uuid, Vec<PublicPost>> = HashMap::new();
    for post in Post::list_by_user_ids(&state.db, &ids).await? {
        posts_by_user
            .entry(post.user_id)
            .or_default()
            .push(post.into());
    }

    let items = users
        .into_iter()
        .map(|user| {
            let posts = posts_by_user.remove(&user.id).unwrap_or_default();
            UserWithPosts {
                user: user.into(),
                posts,
            }
        })
        .collect();
    Ok(Json(UsersResponse::Many(items)))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
