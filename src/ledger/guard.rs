//! Ledger-wide reentrancy guard.
//!
//! One flag per ledger. [`ReentrancyGuard::enter`] sets it and hands back a
//! token that clears it again when dropped, so every exit path of a guarded
//! operation releases the lock. The token owns its own handle to the flag and
//! does not borrow the ledger, which leaves the ledger free to be passed into
//! transfer hooks while the lock is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Non-reentrant lock shared by every guarded ledger operation
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    locked: Arc<AtomicBool>,
}

/// Held while a guarded operation runs; releases the lock on drop
#[derive(Debug)]
#[must_use = "the lock is released as soon as the token is dropped"]
pub struct GuardToken {
    locked: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    /// Create an unlocked guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock, or fail with [`Error::ReentrantCall`] if it is held
    pub fn enter(&self) -> Result<GuardToken> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ReentrantCall)?;
        Ok(GuardToken {
            locked: Arc::clone(&self.locked),
        })
    }

    /// Whether a guarded operation is in progress
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_and_release() {
        let guard = ReentrancyGuard::new();
        assert!(!guard.is_locked());
        {
            let _token = guard.enter().unwrap();
            assert!(guard.is_locked());
            assert_eq!(guard.enter().unwrap_err(), Error::ReentrantCall);
        }
        assert!(!guard.is_locked());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_early_return() {
        fn guarded(guard: &ReentrancyGuard, fail: bool) -> Result<()> {
            let _token = guard.enter()?;
            if fail {
                return Err(Error::InvalidDepositAmount);
            }
            Ok(())
        }

        let guard = ReentrancyGuard::new();
        assert!(guarded(&guard, true).is_err());
        assert!(!guard.is_locked());
        assert!(guarded(&guard, false).is_ok());
    }
}
