use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub user_id: Uuid,
}

/// Partial update; None leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub user_id: Option<Uuid>,
}

impl Post {
    pub async fn create(db: &PgPool, new: NewPost<'_>) -> Result<Post, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, body, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, body, user_id, created_at, updated_at
            "#,
        )
        .bind(new.title)
        .bind(new.body)
        .bind(new.user_id)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, body, user_id, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// All posts, newest first.
    pub async fn list_recent(db: &PgPool) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, body, user_id, created_at, updated_at
            FROM posts
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn list_by_user_ids(db: &PgPool, ids: &[Uuid]) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, body, user_id, created_at, updated_at
            FROM posts
            WHERE user_id = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await
    }

    /// Applies only the supplied fields; updated_at is refreshed either way.
    /// Returns None when no post has that id.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                body = COALESCE($3, body),
                user_id = COALESCE($4, user_id),
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, body, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.body)
        .bind(changes.user_id)
        .fetch_optional(db)
        .await
    }

    /// Returns false when no post had that id.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
