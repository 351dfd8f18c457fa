// In-memory implementation of LedgerStore.
//
// Handy for tests and for running the bot without a database file. Nothing
// survives a restart.

use crate::core::leveling::{LedgerStore, LedgerUpdate, LevelingError, UserRecord};
use async_trait::async_trait;
use dashmap::DashMap;

/// Ledger records keyed by user id.
///
/// **DashMap:** updates lock a single shard entry, so applying all fields of a
/// `LedgerUpdate` through `get_mut` is atomic with respect to other writers.
pub struct InMemoryLedgerStore {
    records: DashMap<u64, UserRecord>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_one(&self, user_id: u64) -> Result<Option<UserRecord>, LevelingError> {
        Ok(self.records.get(&user_id).map(|entry| entry.clone()))
    }

    async fn insert_one(&self, record: UserRecord) -> Result<(), LevelingError> {
        self.records.entry(record.user_id).or_insert(record);
        Ok(())
    }

    async fn update_one(&self, update: LedgerUpdate) -> Result<(), LevelingError> {
        let mut entry = self
            .records
            .get_mut(&update.user_id)
            .ok_or(LevelingError::RecordNotFound(update.user_id))?;
        update.apply_to(&mut entry);
        Ok(())
    }

    async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<UserRecord>, LevelingError> {
        let mut records: Vec<UserRecord> = self
            .records
            .iter()
            .filter(|entry| entry.servers.contains_key(&guild_id))
            .map(|entry| entry.value().clone())
            .collect();

        // Highest level first, progress breaks ties
        records.sort_by(|a, b| {
            let (a, b) = (a.standing(guild_id), b.standing(guild_id));
            (b.level, b.current_exp).cmp(&(a.level, a.current_exp))
        });
        records.truncate(limit);

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::leveling::{GuildStanding, LedgerField};

    fn tracked(user_id: u64, guild_id: u64, level: u32, current_exp: u64) -> UserRecord {
        let mut record = UserRecord::new(user_id);
        record
            .servers
            .insert(guild_id, GuildStanding { level, current_exp });
        record
    }

    #[tokio::test]
    async fn insert_does_not_overwrite() {
        let store = InMemoryLedgerStore::new();
        let mut first = UserRecord::new(1);
        first.total_exp = 50;

        store.insert_one(first).await.unwrap();
        store.insert_one(UserRecord::new(1)).await.unwrap();

        assert_eq!(store.find_one(1).await.unwrap().unwrap().total_exp, 50);
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let store = InMemoryLedgerStore::new();
        let update = LedgerUpdate::new(9).set(LedgerField::TotalExp(1));

        let err = store.update_one(update).await.unwrap_err();
        assert!(matches!(err, LevelingError::RecordNotFound(9)));
    }

    #[tokio::test]
    async fn update_applies_every_field() {
        let store = InMemoryLedgerStore::new();
        store.insert_one(tracked(1, 100, 2, 40)).await.unwrap();

        store
            .update_one(
                LedgerUpdate::new(1)
                    .set(LedgerField::GuildLevel {
                        guild_id: 100,
                        level: 5,
                    })
                    .set(LedgerField::GuildCurrentExp {
                        guild_id: 100,
                        exp: 0,
                    })
                    .set(LedgerField::TotalExp(777)),
            )
            .await
            .unwrap();

        let record = store.find_one(1).await.unwrap().unwrap();
        assert_eq!(record.total_exp, 777);
        assert_eq!(
            record.standing(100),
            GuildStanding {
                level: 5,
                current_exp: 0
            }
        );
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let store = InMemoryLedgerStore::new();
        store.insert_one(tracked(1, 100, 3, 10)).await.unwrap();
        store.insert_one(tracked(2, 100, 1, 90)).await.unwrap();
        store.insert_one(tracked(3, 100, 3, 50)).await.unwrap();
        store.insert_one(tracked(4, 200, 9, 0)).await.unwrap(); // Different guild

        let leaderboard = store.leaderboard(100, 10).await.unwrap();

        let ids: Vec<u64> = leaderboard.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn zero_limit_leaderboard_is_empty() {
        let store = InMemoryLedgerStore::new();
        store.insert_one(tracked(1, 100, 3, 10)).await.unwrap();

        assert!(store.leaderboard(100, 0).await.unwrap().is_empty());
    }
}
