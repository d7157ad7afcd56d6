//! `PlayerRepository`: the persistence contract the core guarantees it
//! calls on login finalize, disconnect, and level-up. Two adapters ship:
//! an in-memory one for tests/dev, and a SQLite-backed one for a real
//! single-node deployment.

use ambonmud_domain::PlayerRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("record corrupt: {0}")]
    Corrupt(String),
}

/// Persists [`PlayerRecord`]s by canonical (lowercased) player name.
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, RepositoryError>;
    async fn save(&self, record: &PlayerRecord) -> Result<(), RepositoryError>;
    async fn exists(&self, name: &str) -> Result<bool, RepositoryError>;
}

/// An in-memory `PlayerRepository`, used by tests and local development
/// without a database.
#[derive(Default)]
pub struct InMemoryPlayerRepository {
    records: DashMap<String, PlayerRecord>,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        Ok(self.records.get(&name.to_ascii_lowercase()).map(|r| r.value().clone()))
    }

    async fn save(&self, record: &PlayerRecord) -> Result<(), RepositoryError> {
        self.records.insert(record.name.to_ascii_lowercase(), record.clone());
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, RepositoryError> {
        Ok(self.records.contains_key(&name.to_ascii_lowercase()))
    }
}

/// A SQLite-backed `PlayerRepository`. Stores each record as a JSON blob
/// keyed by the lowercased player name; simple and schema-free at the
/// player counts this server targets.
pub struct SqlitePlayerRepository {
    pool: SqlitePool,
}

impl SqlitePlayerRepository {
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS players (
                canonical_name TEXT PRIMARY KEY,
                record_json TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl PlayerRepository for SqlitePlayerRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT record_json FROM players WHERE canonical_name = ?",
        )
        .bind(name.to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.map(|(json,)| {
            serde_json::from_str(&json).map_err(|e| RepositoryError::Corrupt(e.to_string()))
        })
        .transpose()
    }

    async fn save(&self, record: &PlayerRecord) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(record).map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        sqlx::query(
            "INSERT INTO players (canonical_name, record_json) VALUES (?, ?)
             ON CONFLICT(canonical_name) DO UPDATE SET record_json = excluded.record_json",
        )
        .bind(record.name.to_ascii_lowercase())
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM players WHERE canonical_name = ?",
        )
        .bind(name.to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::{CoreStats, PlayerClass, Race, RoomId};
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};

    fn sample_record(name: &str) -> PlayerRecord {
        PlayerRecord {
            name: name.to_string(),
            password_hash: "hash".to_string(),
            class: PlayerClass::Warrior,
            race: Race::Human,
            level: 1,
            xp_total: 0,
            gold: 0,
            stats: CoreStats::default(),
            base_max_hp: 50,
            room_id: RoomId::new("zone:start").unwrap(),
            inventory_item_ids: Vec::new(),
            equipped_item_ids: BTreeMap::new(),
            active_quests: BTreeSet::new(),
            completed_quests: BTreeSet::new(),
            achievements: BTreeSet::new(),
            is_staff: false,
            created_at: Utc::now(),
            last_login_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_repository_round_trips() {
        let repo = InMemoryPlayerRepository::new();
        assert!(!repo.exists("Alice").await.unwrap());
        repo.save(&sample_record("Alice")).await.unwrap();
        assert!(repo.exists("alice").await.unwrap());
        let loaded = repo.find_by_name("ALICE").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Alice");
    }

    #[tokio::test]
    async fn sqlite_repository_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("players.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let repo = SqlitePlayerRepository::connect(&url).await.unwrap();

        repo.save(&sample_record("Bob")).await.unwrap();
        assert!(repo.exists("bob").await.unwrap());
        let loaded = repo.find_by_name("Bob").await.unwrap().unwrap();
        assert_eq!(loaded.class, PlayerClass::Warrior);

        let mut updated = sample_record("Bob");
        updated.level = 5;
        repo.save(&updated).await.unwrap();
        let reloaded = repo.find_by_name("Bob").await.unwrap().unwrap();
        assert_eq!(reloaded.level, 5);
    }
}
