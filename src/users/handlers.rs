use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Response},
    routing::{post, put},
    Form, Router,
};
use tracing::{info, instrument};

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;
use crate::flash::{flash_redirect, Notice};
use crate::state::AppState;
use crate::storage::UploadError;
use crate::users::dto::ProfileForm;
use crate::users::repo_types::{normalize_email, UserUpdate};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/profile/avatar", post(upload_avatar))
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
}

#[instrument(skip(state, user, form), fields(user_id = %user.identity.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Response {
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.username.trim().is_empty()
    {
        return flash_redirect(Notice::FieldsRequired, "/profile");
    }

    // Optional password change; empty fields mean "keep the current one".
    let password = form.password.filter(|p| !p.is_empty());
    if let Some(password) = &password {
        if password != form.confirm_password.as_deref().unwrap_or_default() {
            return flash_redirect(Notice::PasswordMismatch, "/profile");
        }
        if password.len() < 6 {
            return flash_redirect(Notice::PasswordTooShort, "/profile");
        }
    }

    let email = normalize_email(&form.email);
    match state.users.find_by_email(&email).await {
        Ok(Some(other)) if other.id != user.identity.id => {
            return flash_redirect(Notice::EmailTaken, "/profile")
        }
        Ok(_) => {}
        Err(err) => return err.into_response(),
    }

    let changes = UserUpdate {
        name: Some(form.name),
        email: Some(email),
        username: Some(form.username),
        bio: form.bio,
        github: form.github,
        linkedin: form.linkedin,
        avatar: None,
        password,
    };
    match state.users.update(user.identity.id, changes).await {
        Ok(updated) => {
            // Patch the live session so the display snapshot doesn't go stale.
            state.sessions.refresh(&user.token, updated.identity());
            info!("profile updated");
            flash_redirect(Notice::ProfileUpdated, "/profile")
        }
        Err(AppError::DuplicateEmail) => flash_redirect(Notice::EmailTaken, "/profile"),
        Err(AppError::Validation(notice)) => flash_redirect(notice, "/profile"),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.identity.id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // a broken multipart stream is a transport failure, not a
            // missing file
            Err(e) => return AppError::Internal(e.into()).into_response(),
        };
        if field.name() == Some("avatar") {
            let content_type = field
                .content_type()
                .map(|ct| ct.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            match field.bytes().await {
                Ok(bytes) => upload = Some((bytes, content_type)),
                Err(e) => return AppError::Internal(e.into()).into_response(),
            }
            break;
        }
    }
    let Some((bytes, content_type)) = upload else {
        return flash_redirect(Notice::AvatarMissing, "/profile");
    };

    let path = match state.avatars.store(bytes, &content_type).await {
        Ok(path) => path,
        Err(UploadError::InvalidFileType) => {
            return flash_redirect(Notice::InvalidFileType, "/profile")
        }
        Err(UploadError::SizeExceeded) => return flash_redirect(Notice::FileTooLarge, "/profile"),
        Err(UploadError::Io(e)) => return AppError::Internal(e.into()).into_response(),
    };

    let changes = UserUpdate {
        avatar: Some(path),
        ..Default::default()
    };
    match state.users.update(user.identity.id, changes).await {
        Ok(updated) => {
            state.sessions.refresh(&user.token, updated.identity());
            info!(avatar = ?updated.avatar, "avatar updated");
            flash_redirect(Notice::AvatarUpdated, "/profile")
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::memory::MemoryPostStore;
    use crate::users::memory::MemoryUserStore;
    use crate::users::repo::UserStore;
    use crate::users::repo_types::NewUser;
    use axum::http::header;
    use std::sync::Arc;

    fn flash_code(res: &Response) -> String {
        res.headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("postline_flash="))
            .and_then(|v| v.split(';').next())
            .unwrap_or_default()
            .to_string()
    }

    async fn logged_in_state() -> (AppState, Arc<MemoryUserStore>, CurrentUser) {
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::fake_with(users.clone(), Arc::new(MemoryPostStore::new()));
        let user = users
            .as_ref()
            .create(NewUser {
                name: "Ana Maria".into(),
                email: "ana@example.com".into(),
                username: "ana".into(),
                password: "secret1".into(),
            })
            .await
            .expect("create user");
        let token = state.sessions.issue(user.identity());
        let current = CurrentUser {
            token,
            identity: user.identity(),
        };
        (state, users, current)
    }

    fn base_form() -> ProfileForm {
        ProfileForm {
            name: "Ana M. Silva".into(),
            email: "ana@example.com".into(),
            username: "ana".into(),
            bio: Some("writes about Rust".into()),
            github: Some("anasilva".into()),
            linkedin: None,
            password: None,
            confirm_password: None,
        }
    }

    #[tokio::test]
    async fn update_persists_and_refreshes_the_session_snapshot() {
        let (state, users, current) = logged_in_state().await;
        let token = current.token.clone();
        let user_id = current.identity.id;

        let res = update_profile(State(state.clone()), current, Form(base_form())).await;
        assert_eq!(flash_code(&res), "profile-updated");

        let stored = users.find_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ana M. Silva");
        assert_eq!(stored.bio.as_deref(), Some("writes about Rust"));

        // the session snapshot was patched, not left stale
        let snapshot = state.sessions.resolve(&token).expect("session alive");
        assert_eq!(snapshot.name, "Ana M. Silva");
    }

    #[tokio::test]
    async fn update_cannot_touch_points() {
        let (state, users, current) = logged_in_state().await;
        let user_id = current.identity.id;
        users.add_points(user_id, 30).await.expect("seed points");

        update_profile(State(state), current, Form(base_form())).await;

        let stored = users.find_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(stored.points, 30);
    }

    #[tokio::test]
    async fn taking_anothers_email_is_rejected() {
        let (state, users, current) = logged_in_state().await;
        users
            .as_ref()
            .create(NewUser {
                name: "Beatriz".into(),
                email: "bia@example.com".into(),
                username: "bia".into(),
                password: "secret2".into(),
            })
            .await
            .expect("create bia");

        let mut form = base_form();
        form.email = "BIA@example.com".into();
        let res = update_profile(State(state), current, Form(form)).await;
        assert_eq!(flash_code(&res), "email-taken");
    }

    #[tokio::test]
    async fn password_change_requires_matching_confirmation() {
        let (state, users, current) = logged_in_state().await;
        let user_id = current.identity.id;
        let before = users.find_by_id(user_id).await.unwrap().unwrap();

        let mut form = base_form();
        form.password = Some("new-secret".into());
        form.confirm_password = Some("other".into());
        let res = update_profile(State(state), current, Form(form)).await;
        assert_eq!(flash_code(&res), "password-mismatch");

        let after = users.find_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(after.password_hash, before.password_hash);
    }

    async fn multipart_from(body: &'static str) -> Multipart {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::Request;

        let req = Request::builder()
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.expect("extract multipart")
    }

    #[tokio::test]
    async fn avatar_upload_stores_and_refreshes_the_session() {
        let (state, users, current) = logged_in_state().await;
        let token = current.token.clone();
        let user_id = current.identity.id;

        let multipart = multipart_from(
            "--BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             not-really-a-png\r\n\
             --BOUNDARY--\r\n",
        )
        .await;
        let res = upload_avatar(State(state.clone()), current, multipart).await;
        assert_eq!(flash_code(&res), "avatar-updated");

        let stored = users.find_by_id(user_id).await.unwrap().unwrap();
        let avatar = stored.avatar.expect("avatar set");
        assert!(avatar.ends_with(".png"));
        let snapshot = state.sessions.resolve(&token).expect("session alive");
        assert_eq!(snapshot.avatar.as_deref(), Some(avatar.as_str()));
    }

    #[tokio::test]
    async fn broken_multipart_stream_is_an_internal_error_not_a_missing_file() {
        let (state, _, current) = logged_in_state().await;

        // no boundary ever arrives, so decoding the stream fails
        let multipart = multipart_from("this is not a multipart body").await;
        let res = upload_avatar(State(state), current, multipart).await;
        assert_eq!(flash_code(&res), "internal-error");
    }

    #[tokio::test]
    async fn matching_password_change_rehashes() {
        let (state, users, current) = logged_in_state().await;
        let user_id = current.identity.id;
        let before = users.find_by_id(user_id).await.unwrap().unwrap();

        let mut form = base_form();
        form.password = Some("new-secret".into());
        form.confirm_password = Some("new-secret".into());
        let res = update_profile(State(state), current, Form(form)).await;
        assert_eq!(flash_code(&res), "profile-updated");

        let after = users.find_by_id(user_id).await.unwrap().unwrap();
        assert_ne!(after.password_hash, before.password_hash);
        assert!(crate::auth::password::verify_password(
            "new-secret",
            &after.password_hash
        ));
    }
}
