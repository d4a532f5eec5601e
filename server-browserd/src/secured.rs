use std::fmt;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Bytes of OS randomness behind every generated secret.
const SECRET_BYTES: usize = 128;

/// An opaque bearer token. Whoever holds it owns the resource it secures.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh hex-encoded secret from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The raw token. Only for handing back to whoever the secret was issued to.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison, including the length check.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        let max_len = expected.len().max(candidate.len());

        // Different pad bytes so a length mismatch can never compare equal
        let mut expected_padded = vec![0u8; max_len];
        let mut candidate_padded = vec![0xFFu8; max_len];
        expected_padded[..expected.len()].copy_from_slice(expected);
        candidate_padded[..candidate.len()].copy_from_slice(candidate);

        let lengths_equal = expected.len().ct_eq(&candidate.len());
        let contents_equal = expected_padded.ct_eq(&candidate_padded);
        (lengths_equal & contents_equal).into()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// A value anyone may read, but only the holder of its secret may replace.
///
/// Writes never mutate in place: a successful [`SecuredResource::with_value`]
/// yields a new wrapper carrying the same secret, which the owner of the
/// slot swaps in wholesale.
#[derive(Debug, Clone)]
pub struct SecuredResource<T> {
    secret: Secret,
    value: T,
}

impl<T> SecuredResource<T> {
    pub fn new(secret: Secret, value: T) -> Self {
        Self { secret, value }
    }

    pub fn validate(&self, candidate: &str) -> bool {
        self.secret.matches(candidate)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns a replacement carrying `new_value`, or `None` if `candidate`
    /// is not the secret. The secret itself never changes.
    pub fn with_value(&self, candidate: &str, new_value: T) -> Option<Self> {
        if !self.validate(candidate) {
            return None;
        }

        Some(Self {
            secret: self.secret.clone(),
            value: new_value,
        })
    }
}
