//! Liveness tokens for pending asynchronous work
//!
//! Each render takes a token from the instance's generation counter.
//! Starting another render or tearing the instance down bumps the
//! counter, which turns every older token stale. Work is never aborted;
//! its results are dropped at the next resumption point instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-instance generation counter
#[derive(Debug, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    /// Create a counter at generation zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate outstanding tokens and issue a fresh one
    pub fn advance(&self) -> Liveness {
        let generation = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        Liveness {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    /// Invalidate outstanding tokens without issuing a new one
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    /// Current generation value
    pub fn value(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

/// Token checked before every state mutation and surface write
#[derive(Debug, Clone)]
pub struct Liveness {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Liveness {
    /// True while no newer render or teardown has happened
    pub fn is_live(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    /// Generation this token was issued for
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_is_live() {
        let generation = Generation::new();
        let token = generation.advance();
        assert!(token.is_live());
        assert_eq!(token.generation(), 1);
    }

    #[test]
    fn test_advance_supersedes_older_token() {
        let generation = Generation::new();
        let first = generation.advance();
        let second = generation.advance();
        assert!(!first.is_live());
        assert!(second.is_live());
    }

    #[test]
    fn test_invalidate_kills_all_tokens() {
        let generation = Generation::new();
        let token = generation.advance();
        generation.invalidate();
        assert!(!token.is_live());
        assert_eq!(generation.value(), 2);
    }
}
