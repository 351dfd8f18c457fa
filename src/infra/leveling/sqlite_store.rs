use crate::core::leveling::{
    GuildStanding, LedgerField, LedgerStore, LedgerUpdate, LevelingError, UserRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::path::Path;

/// SQLite-backed ledger.
///
/// A record is split across two tables: `users` holds the cross-guild fields
/// and `user_servers` holds one row per (user, guild) standing.
pub struct SqliteLedgerStore {
    pool: Pool<Sqlite>,
}

fn storage(err: sqlx::Error) -> LevelingError {
    LevelingError::StorageError(err.to_string())
}

impl SqliteLedgerStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                total_exp INTEGER NOT NULL DEFAULT 0,
                chat_block TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_servers (
                user_id INTEGER NOT NULL REFERENCES users(user_id),
                guild_id INTEGER NOT NULL,
                level INTEGER NOT NULL DEFAULT 0,
                current_exp INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, guild_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_user_servers_rank ON user_servers (guild_id, level DESC, current_exp DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn find_one(&self, user_id: u64) -> Result<Option<UserRecord>, LevelingError> {
        let Some(row) = sqlx::query("SELECT total_exp, chat_block FROM users WHERE user_id = ?")
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
        else {
            return Ok(None);
        };

        let servers = sqlx::query(
            "SELECT guild_id, level, current_exp FROM user_servers WHERE user_id = ?",
        )
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?
        .iter()
        .map(|row| {
            (
                row.get::<i64, _>("guild_id") as u64,
                GuildStanding {
                    level: row.get::<i64, _>("level") as u32,
                    current_exp: row.get::<i64, _>("current_exp") as u64,
                },
            )
        })
        .collect::<HashMap<_, _>>();

        Ok(Some(UserRecord {
            user_id,
            total_exp: row.get::<i64, _>("total_exp") as u64,
            servers,
            chat_block: row.get::<Option<DateTime<Utc>>, _>("chat_block"),
        }))
    }

    async fn insert_one(&self, record: UserRecord) -> Result<(), LevelingError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let inserted = sqlx::query(
            "INSERT INTO users (user_id, total_exp, chat_block) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(record.user_id as i64)
        .bind(record.total_exp as i64)
        .bind(record.chat_block)
        .execute(&mut *tx)
        .await
        .map_err(storage)?
        .rows_affected();

        // Someone else created the record first; leave theirs alone.
        if inserted == 0 {
            return tx.commit().await.map_err(storage);
        }

        for (guild_id, standing) in &record.servers {
            sqlx::query(
                "INSERT INTO user_servers (user_id, guild_id, level, current_exp) VALUES (?, ?, ?, ?)",
            )
            .bind(record.user_id as i64)
            .bind(*guild_id as i64)
            .bind(standing.level as i64)
            .bind(standing.current_exp as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)
    }

    async fn update_one(&self, update: LedgerUpdate) -> Result<(), LevelingError> {
        let user_id = update.user_id as i64;
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let exists = sqlx::query("SELECT 1 FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?
            .is_some();
        if !exists {
            return Err(LevelingError::RecordNotFound(update.user_id));
        }

        for field in &update.sets {
            let query = match field {
                LedgerField::TotalExp(total) => {
                    sqlx::query("UPDATE users SET total_exp = ? WHERE user_id = ?")
                        .bind(*total as i64)
                        .bind(user_id)
                }
                LedgerField::ChatBlock(until) => {
                    sqlx::query("UPDATE users SET chat_block = ? WHERE user_id = ?")
                        .bind(*until)
                        .bind(user_id)
                }
                LedgerField::GuildLevel { guild_id, level } => sqlx::query(
                    r#"
                    INSERT INTO user_servers (user_id, guild_id, level) VALUES (?, ?, ?)
                    ON CONFLICT(user_id, guild_id) DO UPDATE SET level = excluded.level
                    "#,
                )
                .bind(user_id)
                .bind(*guild_id as i64)
                .bind(*level as i64),
                LedgerField::GuildCurrentExp { guild_id, exp } => sqlx::query(
                    r#"
                    INSERT INTO user_servers (user_id, guild_id, current_exp) VALUES (?, ?, ?)
                    ON CONFLICT(user_id, guild_id) DO UPDATE SET current_exp = excluded.current_exp
                    "#,
                )
                .bind(user_id)
                .bind(*guild_id as i64)
                .bind(*exp as i64),
            };

            query.execute(&mut *tx).await.map_err(storage)?;
        }

        tracing::debug!(user_id = update.user_id, fields = ?update.paths(), "Ledger updated");
        tx.commit().await.map_err(storage)
    }

    async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<UserRecord>, LevelingError> {
        let rows = sqlx::query(
            "SELECT user_id FROM user_servers WHERE guild_id = ? ORDER BY level DESC, current_exp DESC LIMIT ?",
        )
        .bind(guild_id as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let user_id = row.get::<i64, _>("user_id") as u64;
            if let Some(record) = self.find_one(user_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteLedgerStore {
        let path = dir.path().join("leveling.db");
        SqliteLedgerStore::new(path.to_str().unwrap())
            .await
            .unwrap()
    }

    fn tracked(user_id: u64, total_exp: u64, guilds: &[(u64, u32, u64)]) -> UserRecord {
        let mut record = UserRecord::new(user_id);
        record.total_exp = total_exp;
        for &(guild_id, level, current_exp) in guilds {
            record
                .servers
                .insert(guild_id, GuildStanding { level, current_exp });
        }
        record
    }

    #[tokio::test]
    async fn round_trips_records_across_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let record = tracked(1, 820, &[(10, 4, 0), (20, 1, 33)]);

        store.insert_one(record.clone()).await.unwrap();

        assert_eq!(store.find_one(1).await.unwrap(), Some(record));
        assert_eq!(store.find_one(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_touches_only_listed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .insert_one(tracked(1, 500, &[(10, 2, 30), (20, 1, 10)]))
            .await
            .unwrap();

        let until = Utc::now() + chrono::Duration::minutes(5);
        store
            .update_one(
                LedgerUpdate::new(1)
                    .set(LedgerField::GuildLevel {
                        guild_id: 10,
                        level: 0,
                    })
                    .set(LedgerField::GuildCurrentExp {
                        guild_id: 10,
                        exp: 0,
                    })
                    .set(LedgerField::TotalExp(470))
                    .set(LedgerField::ChatBlock(Some(until))),
            )
            .await
            .unwrap();

        let record = store.find_one(1).await.unwrap().unwrap();
        assert_eq!(record.total_exp, 470);
        assert_eq!(record.standing(10), GuildStanding::default());
        assert_eq!(
            record.standing(20),
            GuildStanding {
                level: 1,
                current_exp: 10
            }
        );
        assert!(record.is_chat_blocked(Utc::now()));
    }

    #[tokio::test]
    async fn update_without_record_fails_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let err = store
            .update_one(LedgerUpdate::new(5).set(LedgerField::GuildLevel {
                guild_id: 10,
                level: 3,
            }))
            .await
            .unwrap_err();

        assert!(matches!(err, LevelingError::RecordNotFound(5)));
        assert_eq!(store.leaderboard(10, 10).await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn leaderboard_orders_by_level_then_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.insert_one(tracked(1, 0, &[(10, 3, 10)])).await.unwrap();
        store.insert_one(tracked(2, 0, &[(10, 1, 90)])).await.unwrap();
        store.insert_one(tracked(3, 0, &[(10, 3, 50)])).await.unwrap();
        store.insert_one(tracked(4, 0, &[(20, 9, 0)])).await.unwrap();

        let ids: Vec<u64> = store
            .leaderboard(10, 2)
            .await
            .unwrap()
            .iter()
            .map(|r| r.user_id)
            .collect();

        assert_eq!(ids, vec![3, 1]);
        assert!(store.leaderboard(10, 0).await.unwrap().is_empty());
    }
}
