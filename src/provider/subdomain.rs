//! Subdomain selection for load-spread across provider mirrors.

use rand::seq::SliceRandom;

/// Picks one subdomain character from a provider's alphabet per request.
///
/// Returns `None` when no subdomain applies (empty alphabet).
pub trait SubdomainSelector: Send + Sync {
    fn select(&self, alphabet: &str) -> Option<char>;
}

/// Uniformly random choice per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSubdomain;

impl SubdomainSelector for RandomSubdomain {
    fn select(&self, alphabet: &str) -> Option<char> {
        let candidates: Vec<char> = alphabet.chars().collect();
        candidates.choose(&mut rand::thread_rng()).copied()
    }
}

/// Always the character at one position, wrapping for short alphabets.
///
/// Makes request URLs reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSubdomain(pub usize);

impl SubdomainSelector for FixedSubdomain {
    fn select(&self, alphabet: &str) -> Option<char> {
        let count = alphabet.chars().count();
        if count == 0 {
            return None;
        }
        alphabet.chars().nth(self.0 % count)
    }
}
