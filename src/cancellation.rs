//! Reload generations: CancellationToken + generation guard.
//! A newer reload cancels the in-flight fetch of an older one, and a superseded
//! build can never publish its index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Issues reload generations. Each `begin` cancels all prior reloads,
/// advances the generation and hands out a fresh token.
pub struct ReloadGeneration {
    current_token: RwLock<CancellationToken>,
    generation: Arc<AtomicU64>,
}

impl ReloadGeneration {
    pub fn new() -> Self {
        Self {
            current_token: RwLock::new(CancellationToken::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cancel prior reloads, advance the generation, return a guard for the new one.
    pub fn begin(&self) -> ReloadGuard {
        let mut token_guard = self.current_token.write();
        token_guard.cancel();
        let new_root = CancellationToken::new();
        let child = new_root.child_token();
        *token_guard = new_root;
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        ReloadGuard {
            generation: Arc::clone(&self.generation),
            my_generation: gen,
            token: child,
        }
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cancel the in-flight reload without advancing the generation.
    pub fn cancel_all(&self) {
        self.current_token.read().cancel();
    }
}

impl Default for ReloadGeneration {
    fn default() -> Self {
        Self::new()
    }
}

/// Checked by a reload before it publishes.
#[derive(Clone)]
pub struct ReloadGuard {
    generation: Arc<AtomicU64>,
    my_generation: u64,
    token: CancellationToken,
}

impl ReloadGuard {
    #[inline]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.my_generation
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Not cancelled and not superseded.
    #[inline]
    pub fn should_continue(&self) -> bool {
        !self.is_cancelled() && self.is_current()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn my_generation(&self) -> u64 {
        self.my_generation
    }
}
