//! Request Dispatch
//!
//! Routes a validated [`Request`] to its handler. Every handler follows the
//! same shape:
//!
//! ```text
//! lock player → fetch(-or-create) → business rule → economy → achievements → persist → reply
//! ```
//!
//! The player's lock is held from the fetch to the persist, so concurrent
//! requests for one player apply one after another. Achievement changes are
//! computed on a copy and committed only after the store write succeeds.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use serde_json::{json, Value};
use tracing::{debug, warn, Instrument, info_span};

use crate::game::achievements::{AchievementCategory, AchievementTracker};
use crate::game::economy::{click_reward, upgrade_cost, MAX_UPGRADE_LEVEL};
use crate::game::locks::UserLocks;
use crate::game::state::{UserId, UserRecord};
use crate::network::protocol::{Operation, Reply, Request, ValidationError};
use crate::store::{StoreError, UserStore};

/// Error text when a player has no record.
pub const USER_NOT_FOUND: &str = "Result length is 0";

/// Reasons a request ends without doing its work.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Malformed frame.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upgrade code below zero or not owned by the player.
    #[error("Invalid upgrade code {code} for user:{user_id}")]
    InvalidUpgradeCode {
        /// Code requested.
        code: i64,
        /// Player.
        user_id: UserId,
    },

    /// Upgrade already at the top level.
    #[error("Max upgrade is {max} but {level} requested for upgrade {code} on user:{user_id}")]
    MaxLevelReached {
        /// Level ceiling.
        max: u32,
        /// Level the purchase would reach.
        level: u32,
        /// Upgrade slot.
        code: u32,
        /// Player.
        user_id: UserId,
    },

    /// Balance below the upgrade price.
    #[error("Not enough gold - UpgradeCost:{cost} - UserGold:{gold}")]
    InsufficientGold {
        /// Price of the next level.
        cost: u64,
        /// Current balance.
        gold: u64,
    },

    /// Language index outside the stored range.
    #[error("Invalid language index {0}")]
    InvalidLanguage(i64),

    /// No record for the player.
    #[error("{}", USER_NOT_FOUND)]
    UserNotFound,

    /// Store call failed; message forwarded as is.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Store call did not answer in time.
    #[error("Store request timed out after {0:?}")]
    StoreTimeout(Duration),
}

/// Routes requests to handlers over shared game services.
pub struct Dispatcher<S> {
    store: S,
    achievements: Arc<AchievementTracker>,
    locks: UserLocks,
    store_timeout: Option<Duration>,
}

impl<S: UserStore> Dispatcher<S> {
    /// Dispatcher over a store and an achievement cache.
    pub fn new(store: S, achievements: Arc<AchievementTracker>) -> Self {
        Self {
            store,
            achievements,
            locks: UserLocks::new(),
            store_timeout: None,
        }
    }

    /// Fail store calls that take longer than `timeout`.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The achievement cache.
    pub fn achievements(&self) -> &Arc<AchievementTracker> {
        &self.achievements
    }

    /// Per-player lock arena.
    pub fn locks(&self) -> &UserLocks {
        &self.locks
    }

    /// Handle one raw text frame and build its reply.
    pub async fn dispatch(&self, frame: &str) -> Reply {
        match Request::parse(frame) {
            Ok(request) => self.handle(request).await,
            Err(rejected) => {
                let error = ActionError::from(rejected.error);
                debug!(operation = rejected.operation.name(), error = %error, "Rejected frame");
                Reply::failure(rejected.operation.name(), error.to_string())
            }
        }
    }

    /// Handle a validated request.
    pub async fn handle(&self, request: Request) -> Reply {
        let span = info_span!("request", operation = request.name());

        async move {
            let (operation, result) = match request {
                Request::GetUserData { user_id } => {
                    (Operation::GetUserData, self.get_user_data(&user_id).await)
                }
                Request::ChangeLanguage { user_id, language } => {
                    (Operation::ChangeLanguage, self.change_language(&user_id, language).await)
                }
                Request::Upgrade { user_id, code } => {
                    (Operation::Upgrade, self.upgrade(&user_id, code).await)
                }
                Request::BananaClicked { user_id } => {
                    (Operation::BananaClicked, self.banana_clicked(&user_id).await)
                }
                Request::Unknown { name } => {
                    debug!(name = %name, "Unknown operation");
                    return Reply::unknown(&name);
                }
            };

            match result {
                Ok(data) => Reply::new(operation.name(), data),
                Err(e) => {
                    match &e {
                        ActionError::Store(_) | ActionError::StoreTimeout(_) => warn!(error = %e, "Store failure"),
                        _ => debug!(error = %e, "Request rejected"),
                    }
                    Reply::failure(operation.name(), e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Return full state, creating the player on first contact.
    async fn get_user_data(&self, user_id: &UserId) -> Result<Vec<Value>, ActionError> {
        let _guard = self.locks.acquire(user_id).await;

        let record = match self.call(self.store.fetch(user_id)).await? {
            Some(record) => record,
            None => {
                debug!(user = %user_id, "Creating user");
                self.call(self.store.insert_default(user_id)).await?
            }
        };
        let achievements = self.achievements.get_or_create(user_id).await;

        Ok(vec![
            Value::String(json!({ "upgradeList": record.upgrades }).to_string()),
            Value::from(record.gold),
            Value::from(record.language),
            Value::String(json!({ "achievementList": achievements.achievements }).to_string()),
        ])
    }

    /// Persist a language choice.
    async fn change_language(&self, user_id: &UserId, language: i64) -> Result<Vec<Value>, ActionError> {
        let language = u32::try_from(language).map_err(|_| ActionError::InvalidLanguage(language))?;

        let _guard = self.locks.acquire(user_id).await;
        self.call(self.store.update_language(user_id, language)).await?;

        Ok(success())
    }

    /// Buy the next level of an upgrade.
    async fn upgrade(&self, user_id: &UserId, code: i64) -> Result<Vec<Value>, ActionError> {
        let invalid_code = || ActionError::InvalidUpgradeCode { code, user_id: user_id.clone() };
        let slot = u32::try_from(code).map_err(|_| invalid_code())?;

        let _guard = self.locks.acquire(user_id).await;

        let mut record = self.fetch_existing(user_id).await?;
        let current = record.upgrade_level(slot).ok_or_else(invalid_code)?;

        let level = current + 1;
        if level > MAX_UPGRADE_LEVEL {
            return Err(ActionError::MaxLevelReached {
                max: MAX_UPGRADE_LEVEL,
                level,
                code: slot,
                user_id: user_id.clone(),
            });
        }

        let cost = upgrade_cost(level);
        let gold = record.gold.checked_sub(cost).ok_or(ActionError::InsufficientGold {
            cost,
            gold: record.gold,
        })?;

        if let Some(upgrade) = record.upgrade_mut(slot) {
            upgrade.number = level;
        }
        record.gold = gold;

        let mut achievements = self.achievements.get_or_create(user_id).await;
        let purchases = achievements.record_upgrade();
        if achievements.unlock_if_milestone(AchievementCategory::Upgrades, purchases) {
            debug!(user = %user_id, purchases, "Upgrade milestone unlocked");
        }

        self.call(self.store.update_upgrades_and_gold(user_id, &record.upgrades, record.gold))
            .await?;
        self.achievements.store(user_id, achievements).await;

        debug!(user = %user_id, code = slot, level, cost, gold, "Upgrade bought");
        Ok(success())
    }

    /// Credit one click.
    async fn banana_clicked(&self, user_id: &UserId) -> Result<Vec<Value>, ActionError> {
        let _guard = self.locks.acquire(user_id).await;

        let record = self.fetch_existing(user_id).await?;

        let mut achievements = self.achievements.get_or_create(user_id).await;
        // Milestones reached by this click pay out from the next one.
        let reward = click_reward(
            record.primary_level(),
            achievements.total_clicked_milestones,
            achievements.total_upgrade_milestones,
        );

        let clicks = achievements.record_click();
        if achievements.unlock_if_milestone(AchievementCategory::Clicks, clicks) {
            debug!(user = %user_id, clicks, "Click milestone unlocked");
        }

        let gold = record.gold.saturating_add(reward);
        self.call(self.store.update_gold(user_id, gold)).await?;
        self.achievements.store(user_id, achievements).await;

        Ok(success())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn fetch_existing(&self, user_id: &UserId) -> Result<UserRecord, ActionError> {
        self.call(self.store.fetch(user_id))
            .await?
            .ok_or(ActionError::UserNotFound)
    }

    /// Await a store call, applying the configured timeout.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ActionError> {
        match self.store_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| ActionError::StoreTimeout(timeout))?
                .map_err(ActionError::from),
            None => fut.await.map_err(ActionError::from),
        }
    }
}

fn success() -> Vec<Value> {
    vec![Value::from(crate::network::protocol::SUCCESS)]
}
