use serde::Deserialize;

/// Registration form body.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}
