use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Hash a plaintext password with a fresh random salt. The work factor is the
/// library default and is applied uniformly to every account.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Check a plaintext against a stored digest. A malformed digest counts as a
/// mismatch: a corrupt row must fail the login attempt, not crash it.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password digest is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

lazy_static! {
    /// Digest verified against when a login names an unknown email, so both
    /// rejection paths pay for one argon2 verification.
    pub static ref DUMMY_DIGEST: String =
        hash_password("postline-timing-pad").expect("argon2 accepts any bounded utf-8 input");
}
