// Domain models for the leveling ledger.
// Everything here is plain data: no Discord types, no database types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// LEDGER RECORDS
// ============================================================================

/// A user's standing inside a single guild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildStanding {
    pub level: u32,
    /// Progress into the next level, not the cumulative amount.
    pub current_exp: u64,
}

/// The persisted ledger entry for one user.
///
/// `total_exp` spans every guild the user is tracked in, while `servers`
/// keeps the per-guild level and progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: u64,
    pub total_exp: u64,
    pub servers: HashMap<u64, GuildStanding>,
    /// While this lies in the future the user earns no experience.
    pub chat_block: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            total_exp: 0,
            servers: HashMap::new(),
            chat_block: None,
        }
    }

    /// Standing in a guild, or a zeroed standing if the user was never seen there.
    pub fn standing(&self, guild_id: u64) -> GuildStanding {
        self.servers.get(&guild_id).copied().unwrap_or_default()
    }

    pub fn is_chat_blocked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.chat_block, Some(until) if until > now)
    }
}

// ============================================================================
// UPDATE DESCRIPTOR
// ============================================================================
// Stores never receive a whole record to overwrite. They receive the exact set
// of fields that changed, keyed by user id, and must apply them in one go.

/// A single field assignment inside a [`LedgerUpdate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerField {
    TotalExp(u64),
    GuildLevel { guild_id: u64, level: u32 },
    GuildCurrentExp { guild_id: u64, exp: u64 },
    ChatBlock(Option<DateTime<Utc>>),
}

impl LedgerField {
    /// Dotted document path of the field, e.g. `servers.42.level`.
    pub fn path(&self) -> String {
        match self {
            LedgerField::TotalExp(_) => "total_exp".to_string(),
            LedgerField::GuildLevel { guild_id, .. } => format!("servers.{}.level", guild_id),
            LedgerField::GuildCurrentExp { guild_id, .. } => {
                format!("servers.{}.current_exp", guild_id)
            }
            LedgerField::ChatBlock(_) => "chat_block".to_string(),
        }
    }
}

/// Partial update of one user's ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub user_id: u64,
    pub sets: Vec<LedgerField>,
}

impl LedgerUpdate {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            sets: Vec::new(),
        }
    }

    pub fn set(mut self, field: LedgerField) -> Self {
        self.sets.push(field);
        self
    }

    pub fn paths(&self) -> Vec<String> {
        self.sets.iter().map(LedgerField::path).collect()
    }

    /// Apply every assignment to an in-memory record.
    /// Guild fields create the guild entry if it does not exist yet.
    pub fn apply_to(&self, record: &mut UserRecord) {
        for field in &self.sets {
            match *field {
                LedgerField::TotalExp(total) => record.total_exp = total,
                LedgerField::GuildLevel { guild_id, level } => {
                    record.servers.entry(guild_id).or_default().level = level;
                }
                LedgerField::GuildCurrentExp { guild_id, exp } => {
                    record.servers.entry(guild_id).or_default().current_exp = exp;
                }
                LedgerField::ChatBlock(until) => record.chat_block = until,
            }
        }
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Why a level-up event was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelUpReason {
    /// Earned by chatting.
    Message,
    /// Forced by an administrator with `setlevel`.
    Manual,
}

/// Handed to the level-up handler so the Discord layer can announce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpEvent {
    pub user_id: u64,
    pub guild_id: u64,
    pub channel_id: Option<u64>,
    pub old_level: u32,
    pub new_level: u32,
    pub total_exp: u64,
    pub reason: LevelUpReason,
}

/// A guild member as seen by the bulk reset walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildMember {
    pub user_id: u64,
    pub bot: bool,
}

/// What a bulk reset did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub visited: usize,
    pub reset: usize,
    pub skipped_bots: usize,
    pub skipped_missing: usize,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LevelingConfig {
    /// Experience rolled for each eligible message.
    pub xp_range: RangeInclusive<u64>,
    /// Minimum time between two rewarded messages of one user in one guild.
    pub cooldown: Duration,
    /// Bulk reset reports progress and pauses after this many members.
    pub reset_batch: usize,
    pub reset_pause: Duration,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            xp_range: 15..=20,
            cooldown: Duration::from_secs(120),
            reset_batch: 100,
            reset_pause: Duration::from_secs(5),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LevelingError {
    #[error("Level must be a positive number, got {0}")]
    InvalidLevel(i64),

    #[error("Discord user with ID `{0}` not found.")]
    RecordNotFound(u64),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("User is on cooldown. Time remaining: {0:?}")]
    OnCooldown(Duration),

    #[error("User is blocked from earning experience")]
    ChatBlocked,

    #[error("Duration is out of range")]
    InvalidDuration,

    #[error("Invalid user or guild ID")]
    InvalidId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_paths_use_dotted_guild_keys() {
        let update = LedgerUpdate::new(7)
            .set(LedgerField::GuildLevel {
                guild_id: 42,
                level: 3,
            })
            .set(LedgerField::GuildCurrentExp {
                guild_id: 42,
                exp: 0,
            })
            .set(LedgerField::TotalExp(900));

        assert_eq!(
            update.paths(),
            vec!["servers.42.level", "servers.42.current_exp", "total_exp"]
        );
    }

    #[test]
    fn apply_creates_missing_guild_entry() {
        let mut record = UserRecord::new(7);
        LedgerUpdate::new(7)
            .set(LedgerField::GuildLevel {
                guild_id: 9,
                level: 2,
            })
            .apply_to(&mut record);

        assert_eq!(
            record.standing(9),
            GuildStanding {
                level: 2,
                current_exp: 0
            }
        );
    }

    #[test]
    fn chat_block_only_applies_in_the_future() {
        let now = Utc::now();
        let mut record = UserRecord::new(1);
        assert!(!record.is_chat_blocked(now));

        record.chat_block = Some(now - chrono::Duration::seconds(1));
        assert!(!record.is_chat_blocked(now));

        record.chat_block = Some(now + chrono::Duration::seconds(60));
        assert!(record.is_chat_blocked(now));
    }
}
