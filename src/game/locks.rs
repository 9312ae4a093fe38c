//! Per-Player Serialization
//!
//! Every handler runs its read-modify-write section while holding the
//! player's lock, so two requests for the same player never interleave
//! between fetch and persist. Requests for different players run freely.
//!
//! Entries are created on demand and removed by [`UserLocks::prune`] once
//! nobody holds or waits on them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::game::state::UserId;

/// Held while a request owns a player's state. Released on drop.
pub type UserGuard = OwnedMutexGuard<()>;

/// Arena of per-player async mutexes.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<BTreeMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a player. Waiters are served in order.
    pub async fn acquire(&self, user_id: &UserId) -> UserGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(user_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop entries no request holds or waits on. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Number of players with a live entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if no entry is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_exclusive() {
        let locks = Arc::new(UserLocks::new());
        let user = UserId::from("u1");

        let guard = locks.acquire(&user).await;

        let waiter = {
            let locks = locks.clone();
            let user = user.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&user).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.acquire(&UserId::from("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&UserId::from("b"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_keeps_held_entries() {
        let locks = UserLocks::new();
        let held = locks.acquire(&UserId::from("held")).await;
        drop(locks.acquire(&UserId::from("idle")).await);

        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}
