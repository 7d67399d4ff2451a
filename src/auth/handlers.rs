use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::{LoginForm, RegisterForm};
use crate::auth::extractors::Guest;
use crate::auth::password::{verify_password, DUMMY_DIGEST};
use crate::cookie::{self, SESSION_COOKIE};
use crate::error::AppError;
use crate::flash::{flash_redirect, Notice};
use crate::state::AppState;
use crate::users::repo_types::{is_valid_email, normalize_email, NewUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    _guest: Guest,
    Form(form): Form<RegisterForm>,
) -> Response {
    // Validation fully precedes persistence; nothing is written on failure.
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.username.trim().is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return flash_redirect(Notice::FieldsRequired, "/register");
    }
    if form.password != form.confirm_password {
        return flash_redirect(Notice::PasswordMismatch, "/register");
    }
    if form.password.len() < 6 {
        return flash_redirect(Notice::PasswordTooShort, "/register");
    }
    let email = normalize_email(&form.email);
    if !is_valid_email(&email) {
        return flash_redirect(Notice::InvalidEmail, "/register");
    }

    // Best-effort pre-check; the store's unique constraint decides races.
    match state.users.find_by_email(&email).await {
        Ok(Some(_)) => return flash_redirect(Notice::EmailTaken, "/register"),
        Ok(None) => {}
        Err(err) => return err.into_response(),
    }

    let new_user = NewUser {
        name: form.name,
        email,
        username: form.username,
        password: form.password,
    };
    match state.users.create(new_user).await {
        Ok(user) => {
            info!(user_id = %user.id, "user registered");
            flash_redirect(Notice::RegistrationComplete, "/login")
        }
        Err(AppError::DuplicateEmail) => flash_redirect(Notice::EmailTaken, "/register"),
        Err(AppError::Validation(notice)) => flash_redirect(notice, "/register"),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    _guest: Guest,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.email.trim().is_empty() || form.password.is_empty() {
        return flash_redirect(Notice::CredentialsRequired, "/login");
    }
    let email = normalize_email(&form.email);

    let user = match state.users.find_by_email(&email).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    // Unknown email and wrong password must be indistinguishable, in both
    // wording and cost: the absent-user path verifies a fixed dummy digest.
    let verified = match &user {
        Some(user) => verify_password(&form.password, &user.password_hash),
        None => {
            verify_password(&form.password, &DUMMY_DIGEST);
            false
        }
    };
    let Some(user) = user.filter(|_| verified) else {
        warn!("login rejected");
        return AppError::AuthFailed.into_response();
    };

    let token = state.sessions.issue(user.identity());
    info!(user_id = %user.id, "user logged in");

    let mut res = flash_redirect(Notice::LoggedIn, "/");
    let session_cookie = cookie::build(
        SESSION_COOKIE,
        &token,
        Some(state.sessions.ttl_seconds()),
        state.config.session.cookie_secure,
    );
    if let Ok(value) = HeaderValue::from_str(&session_cookie) {
        res.headers_mut().append(header::SET_COOKIE, value);
    }
    res
}

/// Logout works with or without a live session; destroying an absent session
/// is a no-op.
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = cookie::extract(&headers, SESSION_COOKIE) {
        state.sessions.destroy(&token);
    }
    let mut res = flash_redirect(Notice::LoggedOut, "/");
    if let Ok(value) = HeaderValue::from_str(&cookie::build_removal(SESSION_COOKIE)) {
        res.headers_mut().append(header::SET_COOKIE, value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::memory::MemoryPostStore;
    use crate::users::memory::MemoryUserStore;
    use crate::users::repo::UserStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn flash_code(res: &Response) -> String {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("postline_flash="))
            .and_then(|v| v.split(';').next())
            .unwrap_or_default()
            .to_string()
    }

    fn session_token(res: &Response) -> Option<String> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("postline_session="))
            .and_then(|v| v.split(';').next())
            .map(|v| v.to_string())
    }

    fn location(res: &Response) -> &str {
        res.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn state_with_users() -> (AppState, Arc<MemoryUserStore>) {
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::fake_with(users.clone(), Arc::new(MemoryPostStore::new()));
        (state, users)
    }

    fn ana_form() -> RegisterForm {
        RegisterForm {
            name: "Ana Maria".into(),
            email: "a@x.com".into(),
            username: "ana".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_establishes_a_session() {
        let (state, users) = state_with_users();

        let res = register(State(state.clone()), Guest, Form(ana_form())).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
        assert_eq!(flash_code(&res), "registration-complete");

        let stored = users
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .expect("user persisted");
        assert_ne!(stored.password_hash, "secret1");

        let res = login(
            State(state.clone()),
            Guest,
            Form(LoginForm {
                email: "a@x.com".into(),
                password: "secret1".into(),
            }),
        )
        .await;
        assert_eq!(location(&res), "/");
        assert_eq!(flash_code(&res), "logged-in");
        let token = session_token(&res).expect("session cookie set");
        let identity = state.sessions.resolve(&token).expect("session resolves");
        assert_eq!(identity.id, stored.id);
        assert_eq!(identity.email, "a@x.com");
    }

    #[tokio::test]
    async fn mismatched_confirmation_writes_nothing() {
        let (state, users) = state_with_users();
        let mut form = ana_form();
        form.confirm_password = "different".into();

        let res = register(State(state), Guest, Form(form)).await;
        assert_eq!(location(&res), "/register");
        assert_eq!(flash_code(&res), "password-mismatch");
        assert_eq!(users.len().await, 0);
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_persistence() {
        let (state, users) = state_with_users();
        let mut form = ana_form();
        form.password = "abc".into();
        form.confirm_password = "abc".into();

        let res = register(State(state), Guest, Form(form)).await;
        assert_eq!(flash_code(&res), "password-too-short");
        assert_eq!(users.len().await, 0);
    }

    #[tokio::test]
    async fn second_registration_with_same_email_leaves_one_row() {
        let (state, users) = state_with_users();
        register(State(state.clone()), Guest, Form(ana_form())).await;

        let mut again = ana_form();
        again.username = "ana2".into();
        let res = register(State(state), Guest, Form(again)).await;
        assert_eq!(flash_code(&res), "email-taken");
        assert_eq!(users.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_identical() {
        let (state, _) = state_with_users();
        register(State(state.clone()), Guest, Form(ana_form())).await;

        let unknown = login(
            State(state.clone()),
            Guest,
            Form(LoginForm {
                email: "nobody@x.com".into(),
                password: "whatever".into(),
            }),
        )
        .await;
        let wrong = login(
            State(state),
            Guest,
            Form(LoginForm {
                email: "a@x.com".into(),
                password: "not-the-password".into(),
            }),
        )
        .await;

        assert_eq!(flash_code(&unknown), flash_code(&wrong));
        assert_eq!(flash_code(&unknown), "invalid-credentials");
        assert_eq!(location(&unknown), location(&wrong));
        assert!(session_token(&unknown).is_none());
        assert!(session_token(&wrong).is_none());
    }

    #[tokio::test]
    async fn login_email_is_case_folded() {
        let (state, _) = state_with_users();
        register(State(state.clone()), Guest, Form(ana_form())).await;

        let res = login(
            State(state),
            Guest,
            Form(LoginForm {
                email: " A@X.COM ".into(),
                password: "secret1".into(),
            }),
        )
        .await;
        assert_eq!(flash_code(&res), "logged-in");
    }

    #[tokio::test]
    async fn logout_destroys_the_session_and_is_safe_without_one() {
        let (state, _) = state_with_users();
        register(State(state.clone()), Guest, Form(ana_form())).await;
        let res = login(
            State(state.clone()),
            Guest,
            Form(LoginForm {
                email: "a@x.com".into(),
                password: "secret1".into(),
            }),
        )
        .await;
        let token = session_token(&res).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("postline_session={token}")).unwrap(),
        );
        let res = logout(State(state.clone()), headers.clone()).await;
        assert_eq!(flash_code(&res), "logged-out");
        assert!(state.sessions.resolve(&token).is_none());

        // second logout with the same (now dead) cookie, and one with no
        // cookie at all, both succeed
        let res = logout(State(state.clone()), headers).await;
        assert_eq!(flash_code(&res), "logged-out");
        let res = logout(State(state), HeaderMap::new()).await;
        assert_eq!(flash_code(&res), "logged-out");
    }
}
