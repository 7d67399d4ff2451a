use serde::Deserialize;

use crate::posts::repo_types::DEFAULT_CATEGORY;

/// Shared form body for creating and editing a post.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
