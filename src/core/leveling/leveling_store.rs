use super::leveling_models::{LedgerUpdate, LevelingError, UserRecord};
use async_trait::async_trait;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================
// The core defines WHAT it needs from persistence; `infra/leveling` decides HOW.

/// Persistence for ledger records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Look up a record by user id. `None` if the user was never tracked.
    async fn find_one(&self, user_id: u64) -> Result<Option<UserRecord>, LevelingError>;

    /// Insert a brand new record. If the user already has one it is left untouched.
    async fn insert_one(&self, record: UserRecord) -> Result<(), LevelingError>;

    /// Apply every field of `update` to the record in a single step.
    /// Fails with `RecordNotFound` when the user has no record.
    async fn update_one(&self, update: LedgerUpdate) -> Result<(), LevelingError>;

    /// Records tracked in `guild_id`, ordered by level then progress, best first.
    async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<UserRecord>, LevelingError>;
}

// Lets the composition root pick a backend at runtime.
#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for Box<T> {
    async fn find_one(&self, user_id: u64) -> Result<Option<UserRecord>, LevelingError> {
        (**self).find_one(user_id).await
    }

    async fn insert_one(&self, record: UserRecord) -> Result<(), LevelingError> {
        (**self).insert_one(record).await
    }

    async fn update_one(&self, update: LedgerUpdate) -> Result<(), LevelingError> {
        (**self).update_one(update).await
    }

    async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<UserRecord>, LevelingError> {
        (**self).leaderboard(guild_id, limit).await
    }
}
