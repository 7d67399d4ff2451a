use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::session::Identity;
use crate::error::AppError;
use crate::flash::Notice;

/// User row: identity plus reputation. `points` only ever moves through
/// `UserStore::add_points`; `password_hash` never reaches a serialized view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub points: i64,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub avatar: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Denormalized snapshot stored in the session at login time.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Input for `UserStore::create`. Carries the plaintext password; hashing
/// happens inside the store, always.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Partial update; `None` leaves a field untouched. There is deliberately no
/// points field here, and `password` is hashed by the store only when the
/// caller explicitly supplies it.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub avatar: Option<String>,
    pub password: Option<String>,
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Emails are compared and stored lowercased; mixed-case re-registration of
/// the same address must collide.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_name(name: &str) -> Result<(), AppError> {
    let len = name.chars().count();
    if !(2..=100).contains(&len) {
        return Err(AppError::Validation(Notice::InvalidName));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::Validation(Notice::InvalidEmail));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.len() < 6 || password.len() > 255 {
        return Err(AppError::Validation(Notice::PasswordTooShort));
    }
    Ok(())
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.username.trim().is_empty()
        {
            return Err(AppError::Validation(Notice::FieldsRequired));
        }
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_password(&self.password)
    }
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(password) = &self.password {
            check_password(password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            name: "Ana Maria".into(),
            email: "ana@example.com".into(),
            username: "ana".into(),
            password: "secret1".into(),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(new_user().validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let mut user = new_user();
        user.password = "five5".into();
        assert!(matches!(
            user.validate(),
            Err(AppError::Validation(Notice::PasswordTooShort))
        ));
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["not-an-email", "a@b", "a b@c.com", "@x.com"] {
            let mut user = new_user();
            user.email = email.into();
            assert!(
                matches!(user.validate(), Err(AppError::Validation(Notice::InvalidEmail))),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn one_char_name_is_rejected() {
        let mut user = new_user();
        user.name = "A".into();
        assert!(matches!(
            user.validate(),
            Err(AppError::Validation(Notice::InvalidName))
        ));
    }

    #[test]
    fn normalize_email_folds_case_and_whitespace() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn update_validates_only_supplied_fields() {
        let update = UserUpdate {
            bio: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UserUpdate {
            password: Some("abc".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
