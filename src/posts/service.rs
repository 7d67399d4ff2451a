//! Post workflows. Publishing is the only action that feeds the points
//! ledger: one fixed award per successfully created post, nothing for edits
//! or deletes.

use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::posts::repo_types::{NewPost, Post, PostUpdate};
use crate::state::AppState;

/// Fixed award for publishing a post.
pub const POINTS_PER_POST: i64 = 10;

/// Create the post, then award the author. The two writes are independent:
/// if the award fails the post is kept and the failure surfaces as
/// `PointsAwardFailed` so it is never silently lost.
pub async fn publish_post(state: &AppState, new_post: NewPost) -> Result<Post, AppError> {
    new_post.validate()?;
    let author = new_post.user_id;
    let post = state.posts.create(new_post).await?;
    match state.users.add_points(author, POINTS_PER_POST).await {
        Ok(points) => {
            info!(post_id = %post.id, user_id = %author, points, "post published, points awarded");
            Ok(post)
        }
        Err(cause) => Err(AppError::PointsAwardFailed {
            post_id: post.id,
            source: anyhow::Error::new(cause),
        }),
    }
}

/// Ownership-gated edit. `Forbidden` and `NotFound` stay distinct kinds even
/// though the browser sees similar notices for both.
pub async fn edit_post(
    state: &AppState,
    actor: Uuid,
    id: Uuid,
    changes: PostUpdate,
) -> Result<Post, AppError> {
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    if post.user_id != actor {
        return Err(AppError::Forbidden);
    }
    changes.validate()?;
    state.posts.update(id, changes).await
}

/// Ownership-gated delete. No points are reclaimed.
pub async fn remove_post(state: &AppState, actor: Uuid, id: Uuid) -> Result<(), AppError> {
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    if post.user_id != actor {
        return Err(AppError::Forbidden);
    }
    state.posts.delete(id).await
}
