//! Salted one-way password hashing.
//!
//! Hashes are self-describing strings so the iteration count can be raised
//! without invalidating passwords that were stored earlier:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<salt-hex>$<digest-hex>
//! ```
//!
//! The salt participates in PBKDF2 as its hex text, not the decoded bytes.

/// Default PBKDF2 iteration count for newly created hashes.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Salt byte length before hex encoding.
const SALT_BYTES: usize = 16;

/// Derived key length (SHA-256 output size).
const DIGEST_BYTES: usize = 32;

/// Identifier in the first field of every hash string.
const SCHEME: &str = "pbkdf2-sha256";

/// Hashes and verifies passwords with PBKDF2-HMAC-SHA256 and a per-hash salt.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    /// A zero iteration count is bumped to one.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let salt = generate_salt();
        let digest = derive(password, &salt, self.iterations);
        format!("{SCHEME}${}${salt}${}", self.iterations, hex::encode(digest))
    }

    /// Check a password against a stored hash.
    ///
    /// The iteration count is taken from the stored hash, not from `self`.
    /// Anything that does not parse as a hash produced by [`Self::hash`]
    /// verifies as `false`.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((iterations, salt, expected)) = parse(stored) else {
            return false;
        };
        let attempt = derive(password, salt, iterations);
        constant_time_eq(&attempt, &expected)
    }
}

fn parse(stored: &str) -> Option<(u32, &str, Vec<u8>)> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let salt = parts.next()?;
    let digest = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() || salt.is_empty() || digest.len() != DIGEST_BYTES {
        return None;
    }
    Some((iterations, salt, digest))
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; DIGEST_BYTES] {
    let mut out = [0u8; DIGEST_BYTES];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let bytes: [u8; SALT_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn hash_then_verify() {
        let hasher = fast();
        let hash = hasher.hash("correct horse");
        assert!(hash.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("wrong horse", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = fast();
        let a = hasher.hash("repeat");
        let b = hasher.hash("repeat");
        assert_ne!(a, b);
        assert!(hasher.verify("repeat", &a));
        assert!(hasher.verify("repeat", &b));
    }

    #[test]
    fn verify_uses_iterations_from_stored_hash() {
        let old = PasswordHasher::new(500).hash("legacy");
        assert!(PasswordHasher::new(2_000).verify("legacy", &old));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        let hasher = fast();
        for stored in [
            "",
            "plaintext",
            "$2b$12$abcdefghijklmnopqrstuv",
            "pbkdf2-sha256$abc$salt$00",
            "pbkdf2-sha256$0$salt$00",
            "pbkdf2-sha256$1000$$00",
            "pbkdf2-sha256$1000$salt$not-hex",
            "pbkdf2-sha256$1000$salt$abcd",
        ] {
            assert!(!hasher.verify("anything", stored), "accepted {stored:?}");
        }
    }

    #[test]
    fn trailing_fields_are_rejected() {
        let hasher = fast();
        let hash = hasher.hash("pw");
        assert!(!hasher.verify("pw", &format!("{hash}$extra")));
    }

    #[test]
    fn zero_iterations_bumped_to_one() {
        assert_eq!(PasswordHasher::new(0).iterations(), 1);
    }

    #[test]
    fn seed_file_hash_format_verifies() {
        // Shape used by users.json: salt hex text is the PBKDF2 salt.
        let salt = "00112233445566778899aabbccddeeff";
        let digest = derive("student-pass-2024", salt, 1_000);
        let stored = format!("pbkdf2-sha256$1000${salt}${}", hex::encode(digest));
        assert!(fast().verify("student-pass-2024", &stored));
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
