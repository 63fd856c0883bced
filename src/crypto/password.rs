use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 210_000;
// Keeps the user tests fast; the format is identical.
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Stored form of a password: base64 PBKDF2-SHA256 digest and its salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

impl PasswordHash {
    /// Hash with a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        Self {
            hash: STANDARD.encode(derive(password, &salt)),
            salt: STANDARD.encode(salt),
        }
    }

    /// Constant-time check of `password` against the stored digest.
    /// Malformed stored values never verify.
    pub fn verify(&self, password: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (STANDARD.decode(&self.salt), STANDARD.decode(&self.hash)) else {
            return false;
        };
        if expected.len() != HASH_LENGTH {
            return false;
        }
        derive(password, &salt).ct_eq(expected.as_slice()).into()
    }
}

fn derive(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}
