// This is the leveling service - it contains ALL the business logic for the ledger.
// Like the rest of `core/`, it has NO Discord-specific code: it works with plain
// ids and the domain models, and reaches the outside world only through traits.

use super::experience_curve::{ExperienceCurve, LinearCurve};
use super::leveling_models::{
    GuildMember, GuildStanding, LedgerField, LedgerUpdate, LevelUpEvent, LevelUpReason,
    LevelingConfig, LevelingError, ResetSummary, UserRecord,
};
use super::leveling_store::LedgerStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Reacts to a level change: announcements, role sync and the like.
///
/// The service hands events over on a spawned task and never waits for the
/// result, so a failing handler cannot affect ledger state.
#[async_trait]
pub trait LevelUpHandler: Send + Sync {
    async fn handle_levelup(&self, event: &LevelUpEvent) -> anyhow::Result<()>;
}

/// Receives coarse progress updates while a guild is being reset.
#[async_trait]
pub trait ResetProgress: Send + Sync {
    async fn report(&self, processed: usize, total: usize);
}

/// Where a user sits inside their current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub current_exp: u64,
    pub required_exp: u64,
}

impl LevelProgress {
    pub fn ratio(&self) -> f64 {
        if self.required_exp == 0 {
            0.0
        } else {
            self.current_exp as f64 / self.required_exp as f64
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The main service for leveling operations.
///
/// Generic over the store and the experience curve so tests can swap in
/// fakes without touching a database.
pub struct LevelingService<S: LedgerStore, C: ExperienceCurve = LinearCurve> {
    store: S,
    curve: C,
    config: LevelingConfig,
    levelup_handler: Option<Arc<dyn LevelUpHandler>>,
    /// Last rewarded message per (user_id, guild_id).
    last_award: DashMap<(u64, u64), Instant>,
}

impl<S: LedgerStore> LevelingService<S, LinearCurve> {
    pub fn new(store: S) -> Self {
        Self::with_curve(store, LinearCurve::default(), LevelingConfig::default())
    }
}

impl<S: LedgerStore, C: ExperienceCurve> LevelingService<S, C> {
    pub fn with_curve(store: S, curve: C, config: LevelingConfig) -> Self {
        Self {
            store,
            curve,
            config,
            levelup_handler: None,
            last_award: DashMap::new(),
        }
    }

    pub fn with_levelup_handler(mut self, handler: Arc<dyn LevelUpHandler>) -> Self {
        self.levelup_handler = Some(handler);
        self
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    fn validate_ids(user_id: u64, guild_id: u64) -> Result<(), LevelingError> {
        if user_id == 0 || guild_id == 0 {
            Err(LevelingError::InvalidId)
        } else {
            Ok(())
        }
    }

    fn validate_guild_id(guild_id: u64) -> Result<(), LevelingError> {
        if guild_id == 0 {
            Err(LevelingError::InvalidId)
        } else {
            Ok(())
        }
    }

    /// Make sure the user has a ledger record with an entry for `guild_id`.
    ///
    /// Records are created lazily on first activity and never deleted here.
    pub async fn ensure_user(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<UserRecord, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        match self.store.find_one(user_id).await? {
            None => {
                let mut record = UserRecord::new(user_id);
                record.servers.insert(guild_id, GuildStanding::default());
                self.store.insert_one(record.clone()).await?;
                tracing::debug!(user_id, guild_id, "Created ledger record");
                Ok(record)
            }
            Some(mut record) if !record.servers.contains_key(&guild_id) => {
                let update = LedgerUpdate::new(user_id)
                    .set(LedgerField::GuildLevel { guild_id, level: 0 })
                    .set(LedgerField::GuildCurrentExp { guild_id, exp: 0 });
                self.store.update_one(update.clone()).await?;
                update.apply_to(&mut record);
                tracing::debug!(user_id, guild_id, "Added guild to ledger record");
                Ok(record)
            }
            Some(record) => Ok(record),
        }
    }

    pub async fn get_user(&self, user_id: u64) -> Result<Option<UserRecord>, LevelingError> {
        self.store.find_one(user_id).await
    }

    /// Force a user's level in one guild.
    ///
    /// Everything this guild contributed to `total_exp` (the cost of the old
    /// level plus progress into the next one) is removed, then the cost of the
    /// target level is added back. Progress in the guild restarts at zero and
    /// experience earned in other guilds is untouched.
    pub async fn set_level(
        &self,
        user_id: u64,
        guild_id: u64,
        level: i64,
        channel_id: Option<u64>,
    ) -> Result<UserRecord, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;
        let target = u32::try_from(level).map_err(|_| LevelingError::InvalidLevel(level))?;
        let target_exp = self
            .curve
            .level_exp(target)
            .ok_or(LevelingError::InvalidLevel(level))?;

        let mut record = self.ensure_user(user_id, guild_id).await?;
        let standing = record.standing(guild_id);

        let old_server_exp = self.curve.level_exp(standing.level).unwrap_or(u64::MAX);
        let total_exp = record
            .total_exp
            .saturating_sub(old_server_exp)
            .saturating_sub(standing.current_exp)
            .saturating_add(target_exp);

        let update = LedgerUpdate::new(user_id)
            .set(LedgerField::GuildLevel {
                guild_id,
                level: target,
            })
            .set(LedgerField::GuildCurrentExp { guild_id, exp: 0 })
            .set(LedgerField::TotalExp(total_exp));

        self.store.update_one(update.clone()).await?;
        update.apply_to(&mut record);

        tracing::info!(
            user_id,
            guild_id,
            old_level = standing.level,
            new_level = target,
            total_exp,
            "Level set manually"
        );

        self.dispatch_levelup(LevelUpEvent {
            user_id,
            guild_id,
            channel_id,
            old_level: standing.level,
            new_level: target,
            total_exp,
            reason: LevelUpReason::Manual,
        });

        Ok(record)
    }

    /// Zero every member's level and progress in `guild_id`.
    ///
    /// Bots and members without a ledger record are skipped; records are never
    /// created just to be reset. Only the guild's `current_exp` is taken off
    /// `total_exp`: the experience spent on past levels stays in the total.
    pub async fn reset_guild<P>(
        &self,
        guild_id: u64,
        members: &[GuildMember],
        progress: &P,
    ) -> Result<ResetSummary, LevelingError>
    where
        P: ResetProgress + ?Sized,
    {
        Self::validate_guild_id(guild_id)?;

        let batch = self.config.reset_batch.max(1);
        let mut summary = ResetSummary::default();

        for member in members {
            summary.visited += 1;

            if member.bot {
                summary.skipped_bots += 1;
                continue;
            }

            let Some(record) = self.store.find_one(member.user_id).await? else {
                summary.skipped_missing += 1;
                continue;
            };

            let total_exp = record
                .total_exp
                .saturating_sub(record.standing(guild_id).current_exp);

            self.store
                .update_one(
                    LedgerUpdate::new(member.user_id)
                        .set(LedgerField::GuildLevel { guild_id, level: 0 })
                        .set(LedgerField::GuildCurrentExp { guild_id, exp: 0 })
                        .set(LedgerField::TotalExp(total_exp)),
                )
                .await?;

            summary.reset += 1;
            if summary.reset % batch == 0 {
                progress.report(summary.visited, members.len()).await;
                tokio::time::sleep(self.config.reset_pause).await;
            }
        }

        tracing::info!(
            guild_id,
            reset = summary.reset,
            skipped_bots = summary.skipped_bots,
            skipped_missing = summary.skipped_missing,
            "Guild ranks reset"
        );

        Ok(summary)
    }

    /// Bar a user from earning experience for `duration`. Returns the expiry.
    pub async fn xp_ban(
        &self,
        user_id: u64,
        duration: Duration,
    ) -> Result<DateTime<Utc>, LevelingError> {
        if user_id == 0 {
            return Err(LevelingError::InvalidId);
        }

        if self.store.find_one(user_id).await?.is_none() {
            return Err(LevelingError::RecordNotFound(user_id));
        }

        let until = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or(LevelingError::InvalidDuration)?;

        self.store
            .update_one(LedgerUpdate::new(user_id).set(LedgerField::ChatBlock(Some(until))))
            .await?;

        tracing::info!(user_id, %until, "User blocked from earning experience");
        Ok(until)
    }

    /// Process a chat message and potentially award XP.
    ///
    /// **Returns:**
    /// - `Ok(Some(LevelUpEvent))` if the user leveled up
    /// - `Ok(None)` if XP was awarded but no level up occurred
    /// - `Err(LevelingError::OnCooldown)` if the user is on cooldown
    /// - `Err(LevelingError::ChatBlocked)` if the user is xp-banned
    pub async fn process_message(
        &self,
        user_id: u64,
        guild_id: u64,
        channel_id: Option<u64>,
    ) -> Result<Option<LevelUpEvent>, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        let key = (user_id, guild_id);
        if let Some(last) = self.last_award.get(&key).map(|entry| *entry) {
            let elapsed = last.elapsed();
            if elapsed < self.config.cooldown {
                return Err(LevelingError::OnCooldown(self.config.cooldown - elapsed));
            }
        }

        let record = self.ensure_user(user_id, guild_id).await?;
        if record.is_chat_blocked(Utc::now()) {
            return Err(LevelingError::ChatBlocked);
        }

        let gained = self.roll_exp();
        let old = record.standing(guild_id);
        let (new_level, current_exp) = self.apply_gain(old, gained);
        let total_exp = record.total_exp.saturating_add(gained);

        let mut update = LedgerUpdate::new(user_id);
        if new_level != old.level {
            update = update.set(LedgerField::GuildLevel {
                guild_id,
                level: new_level,
            });
        }
        update = update
            .set(LedgerField::GuildCurrentExp {
                guild_id,
                exp: current_exp,
            })
            .set(LedgerField::TotalExp(total_exp));

        self.store.update_one(update).await?;
        self.last_award.insert(key, Instant::now());

        if new_level <= old.level {
            return Ok(None);
        }

        let event = LevelUpEvent {
            user_id,
            guild_id,
            channel_id,
            old_level: old.level,
            new_level,
            total_exp,
            reason: LevelUpReason::Message,
        };
        self.dispatch_levelup(event.clone());
        Ok(Some(event))
    }

    /// Records tracked in a guild, best first.
    pub async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<UserRecord>, LevelingError> {
        Self::validate_guild_id(guild_id)?;
        self.store.leaderboard(guild_id, limit).await
    }

    pub fn progress(&self, standing: GuildStanding) -> LevelProgress {
        LevelProgress {
            level: standing.level,
            current_exp: standing.current_exp,
            required_exp: self.curve.required_exp(standing.level),
        }
    }

    fn roll_exp(&self) -> u64 {
        let range = self.config.xp_range.clone();
        if range.is_empty() {
            return *range.start();
        }
        rand::thread_rng().gen_range(range)
    }

    /// Add `gained` to the progress in a level, carrying over into as many
    /// levels as it pays for.
    fn apply_gain(&self, standing: GuildStanding, gained: u64) -> (u32, u64) {
        let mut level = standing.level;
        let mut current = standing.current_exp.saturating_add(gained);
        loop {
            let required = self.curve.required_exp(level);
            if required == 0 || current < required {
                return (level, current);
            }
            current -= required;
            level += 1;
        }
    }

    fn dispatch_levelup(&self, event: LevelUpEvent) {
        let Some(handler) = self.levelup_handler.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(err) = handler.handle_levelup(&event).await {
                tracing::warn!(
                    user_id = event.user_id,
                    guild_id = event.guild_id,
                    "Level-up handler failed: {err}"
                );
            }
        });
    }
}

// ============================================================================
// TESTS
// ============================================================================
