use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::flash::Notice;

/// Closed category list; posts outside it are rejected at validation.
pub const CATEGORIES: &[&str] = &[
    "javascript",
    "python",
    "java",
    "react",
    "node",
    "sql",
    "css",
    "html",
    "geral",
    "dicas",
    "tutoriais",
];

pub const DEFAULT_CATEGORY: &str = "geral";

/// Authored content; `user_id` is fixed at creation and gates edit/delete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub title: String,
    pub content: String,
    pub category: String,
}

fn check_fields(title: &str, content: &str, category: &str) -> Result<(), AppError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(AppError::Validation(Notice::TitleContentRequired));
    }
    if !CATEGORIES.contains(&category) {
        return Err(AppError::Validation(Notice::InvalidCategory));
    }
    Ok(())
}

impl NewPost {
    pub fn validate(&self) -> Result<(), AppError> {
        check_fields(&self.title, &self.content, &self.category)
    }
}

impl PostUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_fields(&self.title, &self.content, &self.category)
    }
}
