//! Achievement Tracking
//!
//! Per-player click and upgrade counters plus the milestones they unlock.
//! Records live only in process memory: a restart clears them while the
//! persistent user record survives.
//!
//! ## Milestones
//!
//! - **Clicks**: the first tier whose bound is `>= count` decides; the count
//!   unlocks a milestone if it is a multiple of that tier's divisor. Nothing
//!   unlocks past the last tier.
//! - **Upgrades**: unlocks when the purchase count is in [`UPGRADE_MILESTONES`].

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tokio::sync::RwLock;

use crate::game::state::UserId;

/// Click-count tiers as `(upper_bound, divisor)`, ascending.
pub const CLICK_MILESTONE_TIERS: [(u64, u64); 5] = [
    (100, 10),
    (500, 50),
    (1000, 100),
    (5000, 500),
    (10000, 1000),
];

/// Upgrade-purchase counts that unlock a milestone.
pub const UPGRADE_MILESTONES: [u64; 22] = [
    1, 3, 5, 8, 11, 14, 17, 20, 23, 26, 29, 32, 36, 40, 44, 48, 52, 56, 60, 64, 68, 72,
];

/// Kind of counter an achievement tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AchievementCategory {
    /// Bananas clicked.
    Clicks = 0,
    /// Upgrades purchased.
    Upgrades = 1,
}

impl AchievementCategory {
    /// Wire code of this achievement.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Whether `count` unlocks a milestone in this category.
    pub fn is_milestone(self, count: u64) -> bool {
        match self {
            AchievementCategory::Clicks => CLICK_MILESTONE_TIERS
                .iter()
                .find(|(bound, _)| count <= *bound)
                .is_some_and(|(_, divisor)| count.is_multiple_of(*divisor)),
            AchievementCategory::Upgrades => UPGRADE_MILESTONES.contains(&count),
        }
    }
}

/// Cumulative trigger count of one achievement.
///
/// Field names match the wire JSON (`{"code":0,"number":12}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementProgress {
    /// Achievement code.
    pub code: u32,
    /// Times the tracked action happened.
    pub number: u64,
}

/// Achievement state of one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AchievementRecord {
    /// Click milestones reached so far.
    pub total_clicked_milestones: u32,
    /// Upgrade milestones reached so far.
    pub total_upgrade_milestones: u32,
    /// Counters, ordered clicks then upgrades.
    pub achievements: [AchievementProgress; 2],
    /// Highest count that already unlocked, per category.
    last_unlocked: [u64; 2],
}

impl Default for AchievementRecord {
    fn default() -> Self {
        Self {
            total_clicked_milestones: 0,
            total_upgrade_milestones: 0,
            achievements: [
                AchievementProgress { code: AchievementCategory::Clicks.code(), number: 0 },
                AchievementProgress { code: AchievementCategory::Upgrades.code(), number: 0 },
            ],
            last_unlocked: [0; 2],
        }
    }
}

impl AchievementRecord {
    /// Current counter of a category.
    pub fn count(&self, category: AchievementCategory) -> u64 {
        self.achievements[category as usize].number
    }

    /// Count one click, returning the new total.
    pub fn record_click(&mut self) -> u64 {
        self.bump(AchievementCategory::Clicks)
    }

    /// Count one upgrade purchase, returning the new total.
    pub fn record_upgrade(&mut self) -> u64 {
        self.bump(AchievementCategory::Upgrades)
    }

    fn bump(&mut self, category: AchievementCategory) -> u64 {
        let entry = &mut self.achievements[category as usize];
        entry.number += 1;
        entry.number
    }

    /// Unlock a milestone if `count` is one. Returns true on unlock.
    ///
    /// A count at or below the last unlocked one never unlocks again.
    pub fn unlock_if_milestone(&mut self, category: AchievementCategory, count: u64) -> bool {
        let last = &mut self.last_unlocked[category as usize];
        if count <= *last || !category.is_milestone(count) {
            return false;
        }
        *last = count;

        match category {
            AchievementCategory::Clicks => self.total_clicked_milestones += 1,
            AchievementCategory::Upgrades => self.total_upgrade_milestones += 1,
        }
        true
    }
}

/// Process-wide achievement cache, keyed by player.
///
/// Constructed once at startup and handed to the dispatcher. Callers
/// serialize access per player (see [`UserLocks`](crate::game::locks::UserLocks)).
#[derive(Debug, Default)]
pub struct AchievementTracker {
    records: RwLock<BTreeMap<UserId, AchievementRecord>>,
}

impl AchievementTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a player's record, creating the default on first use.
    pub async fn get_or_create(&self, user_id: &UserId) -> AchievementRecord {
        if let Some(record) = self.records.read().await.get(user_id) {
            return record.clone();
        }

        let mut records = self.records.write().await;
        records.entry(user_id.clone()).or_default().clone()
    }

    /// Replace a player's record.
    pub async fn store(&self, user_id: &UserId, record: AchievementRecord) {
        self.records.write().await.insert(user_id.clone(), record);
    }

    /// Number of players tracked.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if no player is tracked.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Forget every player.
    pub async fn reset(&self) {
        self.records.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn clicks_to(record: &mut AchievementRecord, target: u64) -> u32 {
        let mut unlocked = 0;
        while record.count(AchievementCategory::Clicks) < target {
            let count = record.record_click();
            if record.unlock_if_milestone(AchievementCategory::Clicks, count) {
                unlocked += 1;
            }
        }
        unlocked
    }

    #[test]
    fn test_click_milestones_first_tier() {
        for count in (10..=100).step_by(10) {
            assert!(AchievementCategory::Clicks.is_milestone(count), "count {}", count);
        }
        assert!(!AchievementCategory::Clicks.is_milestone(5));
        assert!(!AchievementCategory::Clicks.is_milestone(110));
        assert!(AchievementCategory::Clicks.is_milestone(150));
    }

    #[test]
    fn test_click_milestones_ceiling() {
        assert!(AchievementCategory::Clicks.is_milestone(10000));
        assert!(!AchievementCategory::Clicks.is_milestone(11000));
        assert!(!AchievementCategory::Clicks.is_milestone(20000));
    }

    #[test]
    fn test_click_unlocks_over_first_hundred() {
        let mut record = AchievementRecord::default();
        assert_eq!(clicks_to(&mut record, 100), 10);
        assert_eq!(record.total_clicked_milestones, 10);

        assert_eq!(clicks_to(&mut record, 110), 0);
        assert_eq!(clicks_to(&mut record, 150), 1);
    }

    #[test]
    fn test_repeated_count_does_not_unlock_twice() {
        let mut record = AchievementRecord::default();
        assert!(record.unlock_if_milestone(AchievementCategory::Clicks, 10));
        assert!(!record.unlock_if_milestone(AchievementCategory::Clicks, 10));
        assert_eq!(record.total_clicked_milestones, 1);

        assert!(record.unlock_if_milestone(AchievementCategory::Upgrades, 3));
        assert!(!record.unlock_if_milestone(AchievementCategory::Upgrades, 3));
        assert_eq!(record.total_upgrade_milestones, 1);
    }

    #[test]
    fn test_upgrade_milestones() {
        let mut record = AchievementRecord::default();
        let mut unlocked_at = Vec::new();
        for _ in 0..80 {
            let count = record.record_upgrade();
            if record.unlock_if_milestone(AchievementCategory::Upgrades, count) {
                unlocked_at.push(count);
            }
        }
        assert_eq!(unlocked_at, UPGRADE_MILESTONES.to_vec());
        assert_eq!(record.total_upgrade_milestones, 22);
    }

    #[tokio::test]
    async fn test_tracker_lifecycle() {
        let tracker = AchievementTracker::new();
        let user = UserId::from("u1");

        let mut record = tracker.get_or_create(&user).await;
        assert_eq!(record, AchievementRecord::default());
        assert_eq!(tracker.len().await, 1);

        record.record_click();
        tracker.store(&user, record).await;
        assert_eq!(tracker.get_or_create(&user).await.count(AchievementCategory::Clicks), 1);

        tracker.reset().await;
        assert!(tracker.is_empty().await);
        assert_eq!(tracker.get_or_create(&user).await.count(AchievementCategory::Clicks), 0);
    }

    proptest! {
        #[test]
        fn prop_upgrade_milestone_membership(count in 0u64..200) {
            prop_assert_eq!(
                AchievementCategory::Upgrades.is_milestone(count),
                UPGRADE_MILESTONES.contains(&count)
            );
        }

        #[test]
        fn prop_click_milestones_monotonic(target in 1u64..3000) {
            let mut record = AchievementRecord::default();
            let mut last = 0;
            while record.count(AchievementCategory::Clicks) < target {
                let count = record.record_click();
                record.unlock_if_milestone(AchievementCategory::Clicks, count);
                prop_assert!(record.total_clicked_milestones >= last);
                last = record.total_clicked_milestones;
            }
        }
    }
}
