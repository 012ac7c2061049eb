/// Password hashing (Argon2id) and strength policy
///
/// Hashes are PHC strings, so parameters and salt travel with the hash and
/// verification never needs configuration. Parameters: 64 MiB memory,
/// 3 passes, 4 lanes, 32-byte output.
///
/// # Example
///
/// ```
/// use taskforge_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse 9")?;
/// assert!(verify_password("correct horse 9", &hash)?);
/// assert!(!verify_password("wrong horse 9", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

const MEMORY_KIB: u32 = 65536;
const PASSES: u32 = 3;
const LANES: u32 = 4;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    #[error("Password too weak: {0}")]
    Weak(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_KIB, PASSES, LANES, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes `password` with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks `password` against a stored PHC hash in constant time
///
/// # Returns
///
/// `Ok(false)` for a wrong password; `Err` only if the stored hash is unusable
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::InvalidHash(e.to_string())),
    }
}

/// Enforces the password policy: 8–128 characters with at least one
/// letter and one digit
pub fn check_strength(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LEN {
        return Err(PasswordError::Weak(format!(
            "must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(PasswordError::Weak(format!(
            "must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(PasswordError::Weak("must contain a letter".to_string()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::Weak("must contain a digit".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=65536,t=3,p=4$"));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same-password1").unwrap();
        let b = hash_password("same-password1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-password1", &a).unwrap());
        assert!(verify_password("same-password1", &b).unwrap());
    }

    #[test]
    fn test_wrong_password() {
        let hash = hash_password("right-password1").unwrap();
        assert!(!verify_password("wrong-password1", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_strength_policy() {
        assert!(check_strength("abcdefg1").is_ok());
        assert!(check_strength("pässwörd9").is_ok());
        assert!(check_strength("short1").is_err());
        assert!(check_strength("allletters").is_err());
        assert!(check_strength("12345678").is_err());
        assert!(check_strength(&format!("a1{}", "x".repeat(MAX_PASSWORD_LEN))).is_err());
    }
}
