//! In-memory `UserStore` behind the same trait as the relational store, with
//! a mutex making `add_points` a serialized read-modify-write. Used by
//! `AppState::fake()` and the workflow tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::users::repo::UserStore;
use crate::users::repo_types::{normalize_email, NewUser, User, UserUpdate};

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        new_user.validate()?;
        let email = normalize_email(&new_user.email);
        let password_hash = hash_password(&new_user.password)?;
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|u| u.email == email) {
            return Err(AppError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email,
            username: new_user.username,
            password_hash,
            points: 0,
            bio: None,
            github: None,
            linkedin: None,
            avatar: None,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<User, AppError> {
        changes.validate()?;
        let email = changes.email.as_deref().map(normalize_email);
        let password_hash = match &changes.password {
            Some(plain) => Some(hash_password(plain)?),
            None => None,
        };
        let mut rows = self.rows.lock().await;
        if let Some(email) = &email {
            if rows.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::DuplicateEmail);
            }
        }
        let user = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("user"))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        if let Some(github) = changes.github {
            user.github = Some(github);
        }
        if let Some(linkedin) = changes.linkedin {
            user.linkedin = Some(linkedin);
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        Ok(user.clone())
    }

    async fn add_points(&self, id: Uuid, delta: i64) -> Result<i64, AppError> {
        let mut rows = self.rows.lock().await;
        let user = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("user"))?;
        // same rule the relational schema enforces: points never go negative
        let next = user.points + delta;
        if next < 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "points balance for {id} would drop below zero"
            )));
        }
        user.points = next;
        Ok(next)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|u| u.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }
}
