//! User Store
//!
//! Narrow interface over the persistent user records. The store offers no
//! transaction across a read and a later write: callers hold the player's
//! [`UserLocks`](crate::game::locks::UserLocks) entry around the sequence.
//!
//! - `memory`: in-process store, default backend and test double
//! - `mysql`: MySQL backend (feature `mysql`)

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;

use std::future::Future;

use crate::game::state::{UpgradeLevel, UserId, UserRecord};

pub use memory::MemoryStore;
#[cfg(feature = "mysql")]
pub use mysql::{MySqlConfig, MySqlStore};

/// Store failures. The message is forwarded to the client verbatim.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend rejected or failed the call.
    #[error("{0}")]
    Backend(String),

    /// A stored row could not be decoded.
    #[error("Corrupt record for user {user_id}: {reason}")]
    Corrupt {
        /// Player whose row is broken.
        user_id: UserId,
        /// What was wrong with it.
        reason: String,
    },

    /// Upgrade list could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// MySQL driver error.
    #[cfg(feature = "mysql")]
    #[error("{0}")]
    MySql(#[from] sqlx::Error),
}

/// Persistence calls the request handlers rely on.
///
/// Updates for a player with no record succeed without effect, as an SQL
/// `UPDATE` matching no row does.
pub trait UserStore: Send + Sync + 'static {
    /// Look up a player's record.
    fn fetch(&self, user_id: &UserId)
        -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send;

    /// Create and persist the default record for a new player.
    fn insert_default(&self, user_id: &UserId)
        -> impl Future<Output = Result<UserRecord, StoreError>> + Send;

    /// Persist a language choice.
    fn update_language(&self, user_id: &UserId, language: u32)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist upgrade levels and balance together.
    fn update_upgrades_and_gold(&self, user_id: &UserId, upgrades: &[UpgradeLevel], gold: u64)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist a new balance.
    fn update_gold(&self, user_id: &UserId, gold: u64)
        -> impl Future<Output = Result<(), StoreError>> + Send;
}
