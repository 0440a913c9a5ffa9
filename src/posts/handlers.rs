use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    posts::{
        dto::{CreatePostRequest, DeleteResponse, PostWithUser, PublicPost, UpdatePostRequest},
        repo::{NewPost, Post, PostChanges},
    },
    state::AppState,
    users::{dto::PublicUser, repo::User},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post).get(list_posts))
        .route(
            "/posts/:id",
            get(get_post).patch(update_post).delete(delete_post),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<PublicPost>, ApiError> {
    payload.validate()?;

    // No explicit existence check on user_id; the foreign key constraint
    // rejects orphan inserts and maps to a validation failure.
    let post = Post::create(
        &state.db,
        NewPost {
            title: &payload.title,
            body: &payload.body,
            user_id: payload.user_id,
        },
    )
    .await?;

    info!(post_id = %post.id, user_id = %post.user_id, "post created");
    Ok(Json(post.into()))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostWithUser>>, ApiError> {
    let posts = Post::list_recent(&state.db).await?;

    let mut user_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let users: HashMap<Uuid, PublicUser> = User::find_by_ids(&state.db, &user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.into()))
        .collect();

    let items = posts
        .into_iter()
        .map(|post| {
            let user = users.get(&post.user_id).cloned();
            PostWithUser {
                post: post.into(),
                user,
            }
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostWithUser>, ApiError> {
    let post = Post::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;

    let user = User::find_by_id(&state.db, post.user_id).await?;
    Ok(Json(PostWithUser {
        post: post.into(),
        user: user.map(Into::into),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<PublicPost>, ApiError> {
    payload.validate()?;

    let changes = PostChanges {
        title: payload.title,
        body: payload.body,
        user_id: payload.user_id,
    };
    let post = Post::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;

    info!(post_id = %post.id, "post updated");
    Ok(Json(post.into()))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !Post::delete(&state.db, id).await? {
        warn!(post_id = %id, "delete for missing post");
        return Err(ApiError::NotFound("post not found".into()));
    }

    info!(post_id = %id, "post deleted");
    Ok(Json(DeleteResponse { ok: true }))
}
