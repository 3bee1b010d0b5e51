//! Random secret generation.
//!
//! All randomness flows from one [`SecretGenerator`], seeded once from the
//! operating system. When the OS source is unavailable the [`EntropyPolicy`]
//! decides between failing and falling back to a clock-seeded generator.
//! The fallback is weaker and is logged as such every time it is taken.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use sha1::{Digest, Sha1};
use trustseed_types::{EntropyPolicy, Result, SetupError};
use uuid::Uuid;

/// Where the generator's seed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropySource {
    /// Operating system entropy
    Os,
    /// Wall clock and process id; not suitable for production secrets
    Fallback,
}

/// Generator for every random value trustseed persists.
#[derive(Debug)]
pub struct SecretGenerator {
    rng: StdRng,
    source: EntropySource,
}

impl SecretGenerator {
    /// Seed from the operating system, applying `policy` if that fails.
    pub fn new(policy: EntropyPolicy) -> Result<Self> {
        Self::seeded_from(OsRng, policy)
    }

    /// Seed from an arbitrary entropy source, applying `policy` if it fails.
    pub fn seeded_from<R: RngCore>(source: R, policy: EntropyPolicy) -> Result<Self> {
        match StdRng::from_rng(source) {
            Ok(rng) => Ok(Self { rng, source: EntropySource::Os }),
            Err(e) => match policy {
                EntropyPolicy::Strict => Err(SetupError::Entropy(format!(
                    "system entropy source unavailable ({}) and the entropy policy is strict",
                    e
                ))),
                EntropyPolicy::BestEffort => {
                    tracing::warn!(
                        "System entropy source unavailable ({}); falling back to a clock-seeded generator. \
                         Generated secrets are weaker than usual; use --entropy strict to refuse this.",
                        e
                    );
                    Ok(Self {
                        rng: StdRng::seed_from_u64(fallback_seed()),
                        source: EntropySource::Fallback,
                    })
                }
            },
        }
    }

    /// Deterministic generator for tests and reproducible fixtures.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            source: EntropySource::Fallback,
        }
    }

    /// Where the seed came from.
    pub fn source(&self) -> EntropySource {
        self.source
    }

    /// `count` random bytes, base64 encoded.
    pub fn random_bytes(&mut self, count: usize) -> String {
        let mut bytes = vec![0u8; count];
        self.rng.fill_bytes(&mut bytes);
        STANDARD.encode(&bytes)
    }

    /// Password of `length` characters drawn uniformly from `[A-Za-z0-9]`.
    pub fn password(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| char::from(self.rng.sample(Alphanumeric)))
            .collect()
    }

    /// Random (version 4) UUID.
    pub fn token(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

/// ZooKeeper digest of a credential: base64(SHA-1(`username:credential`)).
pub fn digest(username: &str, credential: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(credential.as_bytes());
    STANDARD.encode(hasher.finalize()).trim_end().to_string()
}

/// Whether `value` parses as a UUID.
pub fn is_token(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

fn fallback_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    nanos ^ (u64::from(std::process::id()) << 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::RngCore;

    struct BrokenSource;

    impl RngCore for BrokenSource {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new("entropy device missing"))
        }
    }

    #[test]
    fn test_digest_matches_zookeeper_construction() {
        assert_eq!(digest("mesos", "abc123"), "mgVW0wa3TtB8v29sBv2W40Uq+X0=");
    }

    #[test]
    fn test_os_seeded_generator() {
        let generator = SecretGenerator::new(EntropyPolicy::Strict).unwrap();
        assert_eq!(generator.source(), EntropySource::Os);
    }

    #[test]
    fn test_strict_policy_refuses_fallback() {
        let result = SecretGenerator::seeded_from(BrokenSource, EntropyPolicy::Strict);
        assert!(matches!(result, Err(SetupError::Entropy(_))));
    }

    #[test]
    fn test_best_effort_policy_falls_back() {
        let mut generator = SecretGenerator::seeded_from(BrokenSource, EntropyPolicy::BestEffort).unwrap();
        assert_eq!(generator.source(), EntropySource::Fallback);
        assert_eq!(generator.password(12).len(), 12);
    }

    #[test]
    fn test_random_bytes_are_base64() {
        let mut generator = SecretGenerator::from_seed(7);
        let key = generator.random_bytes(16);
        assert_eq!(STANDARD.decode(&key).unwrap().len(), 16);
        assert_eq!(key.len(), 24);
    }

    #[test]
    fn test_token_is_v4_uuid() {
        let mut generator = SecretGenerator::from_seed(7);
        let token = generator.token();
        assert!(is_token(&token));
        assert_eq!(Uuid::parse_str(&token).unwrap().get_version_num(), 4);
        assert_ne!(token, generator.token());
    }

    proptest! {
        #[test]
        fn password_has_requested_length_and_alphabet(seed in any::<u64>(), length in 0usize..128) {
            let mut generator = SecretGenerator::from_seed(seed);
            let password = generator.password(length);
            prop_assert_eq!(password.len(), length);
            prop_assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        }

        #[test]
        fn digest_has_no_trailing_whitespace(user in "[a-z]{1,12}", secret in "[A-Za-z0-9]{0,40}") {
            let value = digest(&user, &secret);
            prop_assert_eq!(value.trim_end(), value.as_str());
            prop_assert_eq!(STANDARD.decode(&value).unwrap().len(), 20);
        }
    }
}
