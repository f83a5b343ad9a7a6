//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Hashes are stored as `pbkdf2-sha256$<rounds>$<salt hex>$<hash hex>` so the
//! round count can be raised later without invalidating existing rows.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Round count used for newly created accounts.
pub const DEFAULT_ROUNDS: u32 = 210_000;

/// Errors raised while parsing a stored hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordHashError {
    #[error("unsupported password hash scheme: {0}")]
    UnsupportedScheme(String),
    #[error("malformed password hash")]
    Malformed,
    #[error("password hashing task failed: {0}")]
    Task(String),
}

fn task_failed(err: tokio::task::JoinError) -> PasswordHashError {
    PasswordHashError::Task(err.to_string())
}

/// Derives and verifies password hashes with a fixed round count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    rounds: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS)
    }
}

impl PasswordHasher {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    /// Hash `password` under a fresh random salt.
    ///
    /// # Examples
    /// ```
    /// use snippetbox::domain::password::PasswordHasher;
    ///
    /// let hasher = PasswordHasher::new(1_000);
    /// let stored = hasher.hash("pa$$word");
    /// assert!(stored.starts_with("pbkdf2-sha256$1000$"));
    /// assert!(hasher.verify("pa$$word", &stored).unwrap_or(false));
    /// ```
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0_u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let derived = derive(password, &salt, self.rounds);
        format!(
            "{SCHEME}${}${}${}",
            self.rounds,
            hex::encode(salt),
            hex::encode(derived.as_slice())
        )
    }

    /// Check `password` against a stored hash in constant time.
    ///
    /// The round count embedded in `stored` wins over the hasher's own.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordHashError> {
        let parsed = ParsedHash::parse(stored)?;
        let derived = derive(password, &parsed.salt, parsed.rounds);
        Ok(constant_time_eq(derived.as_slice(), &parsed.hash))
    }

    /// [`Self::hash`] on the blocking thread pool.
    ///
    /// Key derivation takes long enough to stall the async executor, so the
    /// request path always goes through this and [`Self::verify_blocking`].
    pub async fn hash_blocking(self, password: &str) -> Result<String, PasswordHashError> {
        let password = Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || self.hash(&password))
            .await
            .map_err(task_failed)
    }

    /// [`Self::verify`] on the blocking thread pool.
    pub async fn verify_blocking(
        self,
        password: &str,
        stored: String,
    ) -> Result<bool, PasswordHashError> {
        let password = Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || self.verify(&password, &stored))
            .await
            .map_err(task_failed)?
    }
}

struct ParsedHash {
    rounds: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl ParsedHash {
    fn parse(stored: &str) -> Result<Self, PasswordHashError> {
        let mut parts = stored.split('$');
        let scheme = parts.next().unwrap_or_default();
        if scheme != SCHEME {
            return Err(PasswordHashError::UnsupportedScheme(scheme.to_owned()));
        }
        let (Some(rounds), Some(salt), Some(hash), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PasswordHashError::Malformed);
        };
        let rounds: u32 = rounds.parse().map_err(|_| PasswordHashError::Malformed)?;
        if rounds == 0 {
            return Err(PasswordHashError::Malformed);
        }
        let salt = hex::decode(salt).map_err(|_| PasswordHashError::Malformed)?;
        let hash = hex::decode(hash).map_err(|_| PasswordHashError::Malformed)?;
        if hash.len() != HASH_LEN {
            return Err(PasswordHashError::Malformed);
        }
        Ok(Self { rounds, salt, hash })
    }
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> Zeroizing<[u8; HASH_LEN]> {
    let mut out = Zeroizing::new([0_u8; HASH_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out[..]);
    out
}

// Keyed MAC over the candidate, checked with the MAC's constant-time verify.
pub(crate) fn constant_time_eq(candidate: &[u8], expected: &[u8]) -> bool {
    let mut key = Zeroizing::new([0_u8; 32]);
    rand::thread_rng().fill_bytes(&mut key[..]);
    let Ok(mut expected_mac) = HmacSha256::new_from_slice(key.as_slice()) else {
        return false;
    };
    expected_mac.update(expected);
    let tag = expected_mac.finalize().into_bytes();

    let Ok(mut candidate_mac) = HmacSha256::new_from_slice(key.as_slice()) else {
        return false;
    };
    candidate_mac.update(candidate);
    candidate_mac.verify_slice(&tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[rstest]
    fn verifies_matching_password(hasher: PasswordHasher) {
        let stored = hasher.hash("pa$$word");
        assert_eq!(hasher.verify("pa$$word", &stored), Ok(true));
        assert_eq!(hasher.verify("pa$$wordx", &stored), Ok(false));
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn blocking_pool_variants_agree_with_inline_ones(hasher: PasswordHasher) {
        let stored = hasher.hash_blocking("pa$$word").await.expect("hash");
        assert_eq!(hasher.verify("pa$$word", &stored), Ok(true));
        assert_eq!(
            hasher.verify_blocking("pa$$word", stored.clone()).await,
            Ok(true)
        );
        assert_eq!(hasher.verify_blocking("nope", stored).await, Ok(false));
        assert_eq!(
            hasher.verify_blocking("pa$$word", "bcrypt$1$00$00".to_owned()).await,
            Err(PasswordHashError::UnsupportedScheme("bcrypt".to_owned()))
        );
    }

    #[rstest]
    fn salts_differ_between_hashes(hasher: PasswordHasher) {
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[rstest]
    fn stored_rounds_take_precedence(hasher: PasswordHasher) {
        let stored = PasswordHasher::new(2_000).hash("pa$$word");
        assert_eq!(hasher.verify("pa$$word", &stored), Ok(true));
    }

    #[rstest]
    #[case("bcrypt$10$aa$bb", PasswordHashError::UnsupportedScheme("bcrypt".to_owned()))]
    #[case("pbkdf2-sha256$abc$00$00", PasswordHashError::Malformed)]
    #[case("pbkdf2-sha256$0$00$00", PasswordHashError::Malformed)]
    #[case("pbkdf2-sha256$1000$zz$00", PasswordHashError::Malformed)]
    #[case("pbkdf2-sha256$1000$00", PasswordHashError::Malformed)]
    #[case("pbkdf2-sha256$1000$00$00", PasswordHashError::Malformed)]
    fn rejects_malformed_hashes(
        hasher: PasswordHasher,
        #[case] stored: &str,
        #[case] expected: PasswordHashError,
    ) {
        assert_eq!(hasher.verify("pa$$word", stored), Err(expected));
    }
}
