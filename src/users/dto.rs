use serde::Deserialize;

/// Profile edit body. There is no way to express `points` or a raw
/// `password_hash` here; a password change goes through the paired
/// plaintext + confirmation fields and is hashed by the store.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}
