//! Bearer-token checks for mutations and cache administration.
//!
//! Tokens are compared through their SHA-256 digests with a constant-time
//! equality so neither content nor length leaks through timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Decides whether a request may mutate content.
pub trait MutationAuthorizer: Send + Sync {
    fn authorize(&self, bearer: Option<&str>) -> bool;
}

/// Accepts any of a fixed set of bearer tokens.
#[derive(Clone)]
pub struct StaticTokenAuthorizer {
    digests: Vec<Vec<u8>>,
}

impl StaticTokenAuthorizer {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let digests = tokens
            .into_iter()
            .filter(|token| !token.as_ref().is_empty())
            .map(|token| digest(token.as_ref()))
            .collect();
        Self { digests }
    }
}

impl std::fmt::Debug for StaticTokenAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuthorizer")
            .field("tokens", &self.digests.len())
            .finish()
    }
}

impl MutationAuthorizer for StaticTokenAuthorizer {
    fn authorize(&self, bearer: Option<&str>) -> bool {
        let Some(bearer) = bearer else {
            return false;
        };
        let candidate = digest(bearer);
        // Check every token so the match position is not observable.
        self.digests.iter().fold(false, |found, expected| {
            found | bool::from(expected.ct_eq(&candidate))
        })
    }
}

/// Constant-time equality of a presented token and the expected one.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    bool::from(digest(presented).ct_eq(&digest(expected)))
}

fn digest(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Token carried by an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim).filter(|token| !token.is_empty())
}
