//! Game Logic Module
//!
//! Economy rules, achievement tracking and per-player serialization.
//!
//! ## Module Structure
//!
//! - `state`: Persistent player record
//! - `economy`: Upgrade prices and click rewards
//! - `achievements`: Milestone counters (process memory only)
//! - `locks`: Per-player mutual exclusion

pub mod state;
pub mod economy;
pub mod achievements;
pub mod locks;

// Re-export key types
pub use state::{UserId, UserRecord, UpgradeLevel};
pub use economy::{upgrade_cost, click_reward, MAX_UPGRADE_LEVEL};
pub use achievements::{AchievementCategory, AchievementRecord, AchievementTracker};
pub use locks::UserLocks;
