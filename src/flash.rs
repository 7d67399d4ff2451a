//! One-shot user-visible notices, carried across the redirect in a short-lived
//! cookie. Handlers set a notice; the next page render takes it and clears the
//! cookie. Only a stable code travels on the wire so the value stays
//! cookie-safe and the view layer owns the wording/locale.

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};

use crate::cookie::{self, FLASH_COOKIE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Every notice the core can show. One variant per user-facing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    RegistrationComplete,
    FieldsRequired,
    PasswordMismatch,
    PasswordTooShort,
    InvalidEmail,
    InvalidName,
    EmailTaken,
    CredentialsRequired,
    InvalidCredentials,
    LoggedIn,
    LoggedOut,
    LoginRequired,
    ProfileUpdated,
    AvatarUpdated,
    AvatarMissing,
    InvalidFileType,
    FileTooLarge,
    PostCreated,
    PostUpdated,
    PostDeleted,
    PostNotFound,
    NotPostOwner,
    TitleContentRequired,
    InvalidCategory,
    InternalError,
}

impl Notice {
    pub fn kind(self) -> NoticeKind {
        use Notice::*;
        match self {
            RegistrationComplete | LoggedIn | LoggedOut | ProfileUpdated | AvatarUpdated
            | PostCreated | PostUpdated | PostDeleted => NoticeKind::Success,
            _ => NoticeKind::Error,
        }
    }

    /// Stable identifier stored in the flash cookie.
    pub fn code(self) -> &'static str {
        use Notice::*;
        match self {
            RegistrationComplete => "registration-complete",
            FieldsRequired => "fields-required",
            PasswordMismatch => "password-mismatch",
            PasswordTooShort => "password-too-short",
            InvalidEmail => "invalid-email",
            InvalidName => "invalid-name",
            EmailTaken => "email-taken",
            CredentialsRequired => "credentials-required",
            InvalidCredentials => "invalid-credentials",
            LoggedIn => "logged-in",
            LoggedOut => "logged-out",
            LoginRequired => "login-required",
            ProfileUpdated => "profile-updated",
            AvatarUpdated => "avatar-updated",
            AvatarMissing => "avatar-missing",
            InvalidFileType => "invalid-file-type",
            FileTooLarge => "file-too-large",
            PostCreated => "post-created",
            PostUpdated => "post-updated",
            PostDeleted => "post-deleted",
            PostNotFound => "post-not-found",
            NotPostOwner => "not-post-owner",
            TitleContentRequired => "title-content-required",
            InvalidCategory => "invalid-category",
            InternalError => "internal-error",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        use Notice::*;
        let notice = match code {
            "registration-complete" => RegistrationComplete,
            "fields-required" => FieldsRequired,
            "password-mismatch" => PasswordMismatch,
            "password-too-short" => PasswordTooShort,
            "invalid-email" => InvalidEmail,
            "invalid-name" => InvalidName,
            "email-taken" => EmailTaken,
            "credentials-required" => CredentialsRequired,
            "invalid-credentials" => InvalidCredentials,
            "logged-in" => LoggedIn,
            "logged-out" => LoggedOut,
            "login-required" => LoginRequired,
            "profile-updated" => ProfileUpdated,
            "avatar-updated" => AvatarUpdated,
            "avatar-missing" => AvatarMissing,
            "invalid-file-type" => InvalidFileType,
            "file-too-large" => FileTooLarge,
            "post-created" => PostCreated,
            "post-updated" => PostUpdated,
            "post-deleted" => PostDeleted,
            "post-not-found" => PostNotFound,
            "not-post-owner" => NotPostOwner,
            "title-content-required" => TitleContentRequired,
            "invalid-category" => InvalidCategory,
            "internal-error" => InternalError,
            _ => return None,
        };
        Some(notice)
    }

    /// Default English wording; the template layer may localize by code.
    pub fn message(self) -> &'static str {
        use Notice::*;
        match self {
            RegistrationComplete => "Account created. Log in to continue.",
            FieldsRequired => "All fields are required.",
            PasswordMismatch => "Passwords do not match.",
            PasswordTooShort => "Password must be at least 6 characters.",
            InvalidEmail => "Enter a valid email address.",
            InvalidName => "Name must be between 2 and 100 characters.",
            EmailTaken => "That email is already registered.",
            CredentialsRequired => "Email and password are required.",
            InvalidCredentials => "Incorrect email or password.",
            LoggedIn => "Logged in successfully.",
            LoggedOut => "Logged out successfully.",
            LoginRequired => "You must be logged in to view this page.",
            ProfileUpdated => "Profile updated.",
            AvatarUpdated => "Profile photo updated.",
            AvatarMissing => "No image was selected.",
            InvalidFileType => "That file type is not allowed.",
            FileTooLarge => "The image is too large.",
            PostCreated => "Post published.",
            PostUpdated => "Post updated.",
            PostDeleted => "Post deleted.",
            PostNotFound => "Post not found.",
            NotPostOwner => "You do not have permission to modify this post.",
            TitleContentRequired => "Title and content are required.",
            InvalidCategory => "Pick one of the listed categories.",
            InternalError => "Something went wrong. Try again.",
        }
    }
}

/// 303 redirect carrying a flash notice for the next render.
pub fn flash_redirect(notice: Notice, location: &str) -> Response {
    let mut res = Redirect::to(location).into_response();
    // Max-Age bounds a notice that never gets rendered.
    let cookie = cookie::build(FLASH_COOKIE, notice.code(), Some(300), false);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        res.headers_mut().append(header::SET_COOKIE, value);
    }
    res
}

/// Read the pending notice, if any. The caller must attach [`clear_cookie`]
/// to its response so the notice shows exactly once.
pub fn take(headers: &HeaderMap) -> Option<Notice> {
    cookie::extract(headers, FLASH_COOKIE).and_then(|code| Notice::from_code(&code))
}

/// `Set-Cookie` value that consumes the pending notice.
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_str(&cookie::build_removal(FLASH_COOKIE))
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}
