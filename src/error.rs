use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::flash::{flash_redirect, Notice};

/// Failure taxonomy for the auth/points core. Stores and services surface
/// these; handlers translate them into a notice plus a redirect to a recovery
/// point. Nothing here ever renders a raw error page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {}", .0.code())]
    Validation(Notice),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not the owner of this resource")]
    Forbidden,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("incorrect credentials")]
    AuthFailed,

    /// The post was persisted but the points award did not go through.
    /// The post is kept; callers decide whether to retry the award.
    #[error("post {post_id} created but points award failed")]
    PointsAwardFailed {
        post_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (notice, location) = match self {
            AppError::Validation(notice) => (notice, "/"),
            AppError::NotFound("post") => (Notice::PostNotFound, "/posts"),
            AppError::NotFound(entity) => {
                warn!(entity, "referenced entity missing");
                (Notice::InternalError, "/")
            }
            AppError::Forbidden => (Notice::NotPostOwner, "/posts"),
            AppError::DuplicateEmail => (Notice::EmailTaken, "/register"),
            AppError::AuthFailed => (Notice::InvalidCredentials, "/login"),
            AppError::PointsAwardFailed { post_id, source } => {
                // Recorded decision: the post stands, the award failure is an
                // operator problem, and the author still sees success.
                error!(%post_id, error = %source, "points award failed after post creation");
                (Notice::PostCreated, "/posts")
            }
            AppError::Internal(cause) => {
                error!(error = ?cause, "unhandled internal error");
                (Notice::InternalError, "/")
            }
        };
        flash_redirect(notice, location)
    }
}
