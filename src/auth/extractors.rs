use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::session::Identity;
use crate::cookie::{self, SESSION_COOKIE};
use crate::flash::{flash_redirect, Notice};
use crate::state::AppState;

/// Request guard for routes that need an authenticated user. Rejects with a
/// redirect to the login page when no valid session is attached. Must resolve
/// before any handler that reads the identity for ownership checks.
#[derive(Debug)]
pub struct CurrentUser {
    /// Session token, kept so handlers can patch the snapshot after edits.
    pub token: String,
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie::extract(&parts.headers, SESSION_COOKIE)
            .ok_or_else(|| flash_redirect(Notice::LoginRequired, "/login"))?;
        let identity = state
            .sessions
            .resolve(&token)
            .ok_or_else(|| flash_redirect(Notice::LoginRequired, "/login"))?;
        Ok(CurrentUser { token, identity })
    }
}

/// Inverse guard for the register/login flows: an already-authenticated
/// request is bounced home instead of re-entering them.
#[derive(Debug)]
pub struct Guest;

#[async_trait]
impl FromRequestParts<AppState> for Guest {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = cookie::extract(&parts.headers, SESSION_COOKIE) {
            if state.sessions.resolve(&token).is_some() {
                return Err(Redirect::to("/").into_response());
            }
        }
        Ok(Guest)
    }
}
