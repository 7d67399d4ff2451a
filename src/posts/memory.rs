//! In-memory `PostStore`, the test-side counterpart of the relational store.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;
use crate::posts::repo::PostStore;
use crate::posts::repo_types::{NewPost, Post, PostUpdate};

#[derive(Default)]
pub struct MemoryPostStore {
    rows: Mutex<Vec<Post>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create(&self, new_post: NewPost) -> Result<Post, AppError> {
        new_post.validate()?;
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: new_post.user_id,
            title: new_post.title,
            content: new_post.content,
            category: new_post.category,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().await.push(post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, id: Uuid, changes: PostUpdate) -> Result<Post, AppError> {
        changes.validate()?;
        let mut rows = self.rows.lock().await;
        let post = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AppError::NotFound("post"))?;
        post.title = changes.title;
        post.content = changes.content;
        post.category = changes.category;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|p| p.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound("post"));
        }
        Ok(())
    }
}
