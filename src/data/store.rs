//! Key-value persistence
//!
//! All persistent state of this core (key material, follower records) goes
//! through the `KeyValueStore` trait. The production implementation is a
//! single SQLite table via SQLx; tests and embedded callers can use the
//! in-memory store.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};

/// Byte-oriented key-value persistence collaborator
///
/// Keys are namespaced by prefix (e.g. `follower:<actor_uri>`). Mutations on
/// one key are atomic; concurrent writers resolve last-writer-wins, except
/// `put_if_absent` which is first-writer-wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Upsert; overwrites any prior value for the key.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Conditional insert: the first writer wins. Returns the value stored
    /// under the key after the call, which is the caller's value only when
    /// its write won the race.
    async fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<Vec<u8>>;

    /// Delete if present; no-op on a missing key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All entries whose key starts with `prefix`, ordered by key.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    async fn count_prefix(&self, prefix: &str) -> Result<u64>;
}

// =============================================================================
// SQLite implementation
// =============================================================================

/// SQLite-backed store (single `kv` table)
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and run migrations.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string)
            .await
            .map_err(|e| AppError::KeyStoreUnavailable(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
        })?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<Vec<u8>, _>("value")))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<Vec<u8>> {
        // INSERT OR IGNORE keeps the first writer's row; losers re-read.
        sqlx::query("INSERT OR IGNORE INTO kv (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<Vec<u8>, _>("value"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let rows = sqlx::query(
            "SELECT key, value FROM kv WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("key"), row.get::<Vec<u8>, _>("value")))
            .collect())
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM kv WHERE key LIKE ? ESCAPE '\\'")
                .bind(format!("{}%", escape_like(prefix)))
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

/// Escape LIKE wildcards in a literal key prefix.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// =============================================================================
// In-memory implementation
// =============================================================================

/// In-memory store for tests and embedded use
///
/// BTreeMap keeps `list_prefix` order identical to the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<Vec<u8>> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .entry(key.to_string())
            .or_insert_with(|| value.to_vec())
            .clone())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        Ok(self.list_prefix(prefix).await?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn sqlite_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::connect(&temp_dir.path().join("store_test.db"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn sqlite_put_get_roundtrip_and_overwrite() {
        let (store, _temp_dir) = sqlite_store().await;

        store.put("a", b"one").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"one".to_vec()));

        store.put("a", b"two").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn sqlite_put_if_absent_keeps_first_writer() {
        let (store, _temp_dir) = sqlite_store().await;

        let first = store.put_if_absent("key", b"first").await.unwrap();
        let second = store.put_if_absent("key", b"second").await.unwrap();

        assert_eq!(first, b"first".to_vec());
        assert_eq!(second, b"first".to_vec());
        assert_eq!(store.get("key").await.unwrap(), Some(b"first".to_vec()));
    }

    #[tokio::test]
    async fn sqlite_delete_missing_key_is_noop() {
        let (store, _temp_dir) = sqlite_store().await;
        store.delete("absent").await.unwrap();
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_list_prefix_filters_and_orders() {
        let (store, _temp_dir) = sqlite_store().await;

        store.put("follower:b", b"2").await.unwrap();
        store.put("follower:a", b"1").await.unwrap();
        store.put("key:actor", b"x").await.unwrap();

        let entries = store.list_prefix("follower:").await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["follower:a", "follower:b"]);
        assert_eq!(store.count_prefix("follower:").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn memory_store_matches_sqlite_semantics() {
        let store = MemoryStore::new();

        store.put("follower:a", b"1").await.unwrap();
        let kept = store.put_if_absent("follower:a", b"9").await.unwrap();
        assert_eq!(kept, b"1".to_vec());

        store.put("follower:b", b"2").await.unwrap();
        store.delete("follower:a").await.unwrap();
        store.delete("follower:a").await.unwrap();

        let entries = store.list_prefix("follower:").await.unwrap();
        assert_eq!(entries, vec![("follower:b".to_string(), b"2".to_vec())]);
        assert_eq!(store.count_prefix("follower:").await.unwrap(), 1);
    }

    #[test]
    fn escape_like_escapes_sql_wildcards() {
        assert_eq!(escape_like("a%b_c"), "a\\%b\\_c");
    }
}
