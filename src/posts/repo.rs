use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::posts::repo_types::{NewPost, Post, PostUpdate};

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, new_post: NewPost) -> Result<Post, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, AppError>;
    async fn update(&self, id: Uuid, changes: PostUpdate) -> Result<Post, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

const POST_COLUMNS: &str = "id, user_id, title, content, category, created_at, updated_at";

pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_sqlx(e: sqlx::Error) -> AppError {
    AppError::Internal(e.into())
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create(&self, new_post: NewPost) -> Result<Post, AppError> {
        new_post.validate()?;
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, user_id, title, content, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_post.user_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(&new_post.category)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(post)
    }

    async fn update(&self, id: Uuid, changes: PostUpdate) -> Result<Post, AppError> {
        changes.validate()?;
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts SET title = $2, content = $3, category = $4, updated_at = now()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.category)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)?;
        post.ok_or(AppError::NotFound("post"))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("post"));
        }
        Ok(())
    }
}
