//! Liveness flag for in-flight panel operations
//!
//! Loads and scans cannot be aborted. When their consumer goes away, the
//! operation still finishes, and the consumer's token tells it to drop the
//! result instead of applying it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "is anyone still listening" flag.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    alive: Arc<AtomicBool>,
}

impl LivenessToken {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check whether results should still be applied.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the consumer as gone. Irreversible.
    pub fn detach(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for LivenessToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_alive() {
        assert!(LivenessToken::new().is_alive());
    }

    #[test]
    fn detach_clears_token() {
        let token = LivenessToken::new();
        token.detach();
        assert!(!token.is_alive());
    }

    #[test]
    fn cloned_token_shares_state() {
        let token = LivenessToken::new();
        let clone = token.clone();
        token.detach();
        assert!(!clone.is_alive());
    }
}
