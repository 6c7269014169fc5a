// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use anyhow::anyhow;
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use zeroize::Zeroize;

/// Minimum password length, matching the registration validation rule
pub const MIN_PASSWORD_LENGTH: usize = 8;

// Interactive-login scrypt cost (N = 2^12). The parameters are encoded
// in each hash, so verification works regardless of what future hashes
// are written with.
const SCRYPT_LOG_N: u8 = 12;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Hash a password using scrypt with a per-hash random salt
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, Params::RECOMMENDED_LEN)
        .map_err(|e| anyhow!("invalid scrypt params: {e}"))?;
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| anyhow!("scrypt hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a stored hash. Any parse failure of the
/// stored hash counts as a mismatch.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Hash a password and zeroize the plaintext afterwards
pub fn hash_password_secure(plain: &mut String) -> anyhow::Result<String> {
    let hash = hash_password(plain)?;
    plain.zeroize();
    Ok(hash)
}
