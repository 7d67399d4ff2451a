use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::users::repo_types::{normalize_email, NewUser, User, UserUpdate};

/// Credential store interface. Handlers never touch rows directly; every
/// mutation goes through here so the invariants (hash-before-persist,
/// points-only-via-add_points) hold for every implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<User, AppError>;
    /// Atomic per-user increment; concurrent awards must not lose updates.
    async fn add_points(&self, id: Uuid, delta: i64) -> Result<i64, AppError>;
    /// Administrative removal; unused by the request paths.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

const USER_COLUMNS: &str =
    "id, name, email, username, password_hash, points, bio, github, linkedin, avatar, created_at";

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// The unique index on `users.email` is the authoritative duplicate guard;
/// application-level pre-checks are best-effort only.
fn map_sqlx(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::DuplicateEmail;
        }
    }
    AppError::Internal(e.into())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        new_user.validate()?;
        let email = normalize_email(&new_user.email);
        let password_hash = hash_password(&new_user.password)?;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, username, password_hash, points)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&email)
        .bind(&new_user.username)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<User, AppError> {
        changes.validate()?;
        let email = changes.email.as_deref().map(normalize_email);
        let password_hash = match &changes.password {
            Some(plain) => Some(hash_password(plain)?),
            None => None,
        };
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                username = COALESCE($4, username),
                bio = COALESCE($5, bio),
                github = COALESCE($6, github),
                linkedin = COALESCE($7, linkedin),
                avatar = COALESCE($8, avatar),
                password_hash = COALESCE($9, password_hash)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&email)
        .bind(&changes.username)
        .bind(&changes.bio)
        .bind(&changes.github)
        .bind(&changes.linkedin)
        .bind(&changes.avatar)
        .bind(&password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)?;
        user.ok_or(AppError::NotFound("user"))
    }

    async fn add_points(&self, id: Uuid, delta: i64) -> Result<i64, AppError> {
        // Single-statement read-modify-write; the row lock serializes
        // concurrent awards for the same user.
        let points: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET points = points + $2 WHERE id = $1 RETURNING points",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)?;
        points.ok_or(AppError::NotFound("user"))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }
}
