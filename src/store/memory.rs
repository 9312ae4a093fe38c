//! In-Memory User Store
//!
//! Keeps records in a map for the lifetime of the process. Used when no
//! database is configured, and by the tests.

use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::game::state::{UpgradeLevel, UserId, UserRecord};
use crate::store::{StoreError, UserStore};

/// Map-backed [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<UserId, UserRecord>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored players.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// True if no player is stored.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Insert or replace a record directly.
    pub async fn put(&self, record: UserRecord) {
        self.users.write().await.insert(record.user_id.clone(), record);
    }
}

impl UserStore for MemoryStore {
    async fn fetch(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn insert_default(&self, user_id: &UserId) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(user_id) {
            return Err(StoreError::Backend(format!("Duplicate entry '{}' for key 'PRIMARY'", user_id)));
        }

        let record = UserRecord::new_default(user_id.clone());
        users.insert(user_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_language(&self, user_id: &UserId, language: u32) -> Result<(), StoreError> {
        if let Some(record) = self.users.write().await.get_mut(user_id) {
            record.language = language;
        }
        Ok(())
    }

    async fn update_upgrades_and_gold(
        &self,
        user_id: &UserId,
        upgrades: &[UpgradeLevel],
        gold: u64,
    ) -> Result<(), StoreError> {
        if let Some(record) = self.users.write().await.get_mut(user_id) {
            record.upgrades = upgrades.to_vec();
            record.gold = gold;
        }
        Ok(())
    }

    async fn update_gold(&self, user_id: &UserId, gold: u64) -> Result<(), StoreError> {
        if let Some(record) = self.users.write().await.get_mut(user_id) {
            record.gold = gold;
        }
        Ok(())
    }
}
