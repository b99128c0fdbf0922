use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::error::{Error, Result};

const GENERATED_PASSWORD_BYTES: usize = 12;

/// PHC-format hash of `secret` under `argon2` with a fresh salt.
pub(super) fn hash_with(argon2: &Argon2<'_>, secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(format!("failed to hash secret: {e}")))
}

/// Checks `secret` against a stored PHC hash. A mismatch is `Ok(false)`.
pub(super) fn verify_with(argon2: &Argon2<'_>, secret: &str, hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| Error::Internal(format!("malformed hash: {e}")))?;

    match argon2.verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Internal(format!("failed to verify secret: {e}"))),
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    hash_with(&Argon2::default(), password)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    verify_with(&Argon2::default(), password, hash)
}

/// Random hex password handed out when an administrator does not pick one.
#[must_use]
pub fn generate_password() -> String {
    let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_internal() {
        assert!(matches!(
            verify_password("hunter2", "not-a-phc-string"),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_generated_passwords_differ() {
        let a = generate_password();
        assert_eq!(a.len(), GENERATED_PASSWORD_BYTES * 2);
        assert_ne!(a, generate_password());
    }
}
