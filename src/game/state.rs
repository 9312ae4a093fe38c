//! Player State Definitions
//!
//! The persistent per-player record: currency balance, upgrade levels and
//! language preference. Owned by the [`UserStore`](crate::store::UserStore);
//! handlers only ever work on copies fetched from it.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// USER ID
// =============================================================================

/// Opaque player identifier as sent by the client.
///
/// Implements Ord for BTreeMap keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// UPGRADES
// =============================================================================

/// Upgrade slot that multiplies the per-click reward.
pub const PRIMARY_UPGRADE_CODE: u32 = 0;

/// Upgrade slots every new player owns.
pub const DEFAULT_UPGRADE_CODES: [u32; 2] = [0, 1];

/// One upgrade slot and the level owned in it.
///
/// Field names match the stored JSON (`{"code":0,"number":3}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeLevel {
    /// Upgrade slot code.
    pub code: u32,
    /// Owned level, 0..=36.
    pub number: u32,
}

impl UpgradeLevel {
    /// A slot at level 0.
    pub const fn new(code: u32) -> Self {
        Self { code, number: 0 }
    }
}

// =============================================================================
// USER RECORD
// =============================================================================

/// Persistent state of one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Primary key.
    pub user_id: UserId,
    /// One entry per known upgrade slot, in slot order.
    pub upgrades: Vec<UpgradeLevel>,
    /// Currency balance.
    pub gold: u64,
    /// Language enum index.
    pub language: u32,
}

impl UserRecord {
    /// Record created for a first-time player.
    pub fn new_default(user_id: UserId) -> Self {
        Self {
            user_id,
            upgrades: default_upgrades(),
            gold: 0,
            language: 0,
        }
    }

    /// Level owned in the given slot, if the slot exists.
    pub fn upgrade_level(&self, code: u32) -> Option<u32> {
        self.upgrades
            .iter()
            .find(|u| u.code == code)
            .map(|u| u.number)
    }

    /// Mutable access to a slot by code.
    pub fn upgrade_mut(&mut self, code: u32) -> Option<&mut UpgradeLevel> {
        self.upgrades.iter_mut().find(|u| u.code == code)
    }

    /// Level of the click multiplier upgrade (0 if the slot is missing).
    pub fn primary_level(&self) -> u32 {
        self.upgrade_level(PRIMARY_UPGRADE_CODE).unwrap_or(0)
    }
}

/// Upgrade list of a first-time player.
pub fn default_upgrades() -> Vec<UpgradeLevel> {
    DEFAULT_UPGRADE_CODES.iter().map(|&code| UpgradeLevel::new(code)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = UserRecord::new_default(UserId::from("u1"));
        assert_eq!(record.gold, 0);
        assert_eq!(record.language, 0);
        assert_eq!(record.upgrades, vec![UpgradeLevel::new(0), UpgradeLevel::new(1)]);
        assert_eq!(record.primary_level(), 0);
    }

    #[test]
    fn test_upgrade_lookup() {
        let mut record = UserRecord::new_default(UserId::from("u1"));
        record.upgrade_mut(1).unwrap().number = 4;

        assert_eq!(record.upgrade_level(1), Some(4));
        assert_eq!(record.upgrade_level(7), None);
        assert!(record.upgrade_mut(7).is_none());
    }

    #[test]
    fn test_upgrade_json_shape() {
        let json = serde_json::to_string(&default_upgrades()).unwrap();
        assert_eq!(json, r#"[{"code":0,"number":0},{"code":1,"number":0}]"#);
    }
}
