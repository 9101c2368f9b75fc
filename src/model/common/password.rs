use argon2::Config;
use rand::Rng;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
        .expect("the default argon2 config is valid")
}

/// Check a plaintext password against a stored hash.
/// A malformed hash never verifies.
pub fn verify_password(password_hash: &str, password: impl AsRef<[u8]>) -> bool {
    argon2::verify_encoded(password_hash, password.as_ref()).unwrap_or(false)
}
