use crate::core::weather::{UnitPreferenceStore, Units, WeatherError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UnitPreferences {
    #[serde(default)]
    guilds: HashMap<u64, Units>,
    #[serde(default)]
    users: HashMap<u64, Units>,
}

/// Unit preferences kept in a single JSON file, cached in memory.
pub struct JsonUnitStore {
    path: PathBuf,
    cache: RwLock<UnitPreferences>,
}

impl JsonUnitStore {
    pub fn new(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let prefs = if path.exists() {
            let file = std::fs::File::open(&path)?;
            serde_json::from_reader(file).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    "Unreadable unit preferences, starting empty: {}",
                    e
                );
                UnitPreferences::default()
            })
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            UnitPreferences::default()
        };

        Ok(Self {
            path,
            cache: RwLock::new(prefs),
        })
    }

    async fn persist(&self) -> Result<(), WeatherError> {
        let cache = self.cache.read().await;
        let file =
            std::fs::File::create(&self.path).map_err(|e| WeatherError::Store(e.to_string()))?;
        serde_json::to_writer_pretty(file, &*cache).map_err(|e| WeatherError::Store(e.to_string()))
    }
}

#[async_trait]
impl UnitPreferenceStore for JsonUnitStore {
    async fn guild_units(&self, guild_id: u64) -> Result<Option<Units>, WeatherError> {
        Ok(self.cache.read().await.guilds.get(&guild_id).copied())
    }

    async fn set_guild_units(&self, guild_id: u64, units: Units) -> Result<(), WeatherError> {
        let mut cache = self.cache.write().await;
        cache.guilds.insert(guild_id, units);
        drop(cache);
        self.persist().await
    }

    async fn user_units(&self, user_id: u64) -> Result<Option<Units>, WeatherError> {
        Ok(self.cache.read().await.users.get(&user_id).copied())
    }

    async fn set_user_units(
        &self,
        user_id: u64,
        units: Option<Units>,
    ) -> Result<(), WeatherError> {
        let mut cache = self.cache.write().await;
        let changed = match units {
            Some(units) => cache.users.insert(user_id, units) != Some(units),
            None => cache.users.remove(&user_id).is_some(),
        };
        drop(cache);
        if !changed {
            return Ok(());
        }
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preferences_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_units.json");

        let store = JsonUnitStore::new(&path).unwrap();
        store.set_guild_units(7, Units::Us).await.unwrap();
        store.set_user_units(1, Some(Units::Ca)).await.unwrap();
        store.set_user_units(2, Some(Units::Uk2)).await.unwrap();
        store.set_user_units(2, None).await.unwrap();

        let reloaded = JsonUnitStore::new(&path).unwrap();
        assert_eq!(reloaded.guild_units(7).await.unwrap(), Some(Units::Us));
        assert_eq!(reloaded.user_units(1).await.unwrap(), Some(Units::Ca));
        assert_eq!(reloaded.user_units(2).await.unwrap(), None);
        assert_eq!(reloaded.guild_units(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_units.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonUnitStore::new(&path).unwrap();

        assert_eq!(store.user_units(1).await.unwrap(), None);
    }
}
