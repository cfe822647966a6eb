//! Password hashing with argon2id. Hashes are PHC strings and are the only
//! credential form the store ever persists.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::StoreError;

/// Hash a plaintext password with a fresh random salt.
pub fn hash(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(StoreError::Credentials)?
        .to_string();
    Ok(hashed)
}

/// True only when `password` verifies against the stored PHC string. A
/// wrong password and a malformed stored hash both come back false; callers
/// treat either as an ordinary authentication miss.
pub fn verify(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
