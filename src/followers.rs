//! Follower directory
//!
//! The set of remote actors subscribed to this publisher, persisted as JSON
//! records in the key-value store under the `follower:` prefix. Records are
//! keyed by actor URI and replaced whole; there is no partial mutation.

use std::sync::Arc;

use crate::data::{Follower, KeyValueStore};
use crate::error::{AppError, Result};
use crate::metrics::FOLLOWERS_TOTAL;

const FOLLOWER_PREFIX: &str = "follower:";

/// Owns the follower set and its delivery endpoints
pub struct FollowerDirectory {
    store: Arc<dyn KeyValueStore>,
}

impl FollowerDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Upsert a follower keyed by its actor URI. A re-follow overwrites the
    /// prior record.
    pub async fn add(&self, follower: &Follower) -> Result<()> {
        let encoded = serde_json::to_vec(follower).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to encode follower: {}", e))
        })?;
        self.store
            .put(&storage_key(&follower.actor_uri), &encoded)
            .await?;

        FOLLOWERS_TOTAL.set(self.count().await? as i64);
        tracing::info!(actor = %follower.actor_uri, "Follower recorded");
        Ok(())
    }

    /// Remove by actor URI; removing an absent follower is a no-op.
    pub async fn remove(&self, actor_uri: &str) -> Result<()> {
        self.store.delete(&storage_key(actor_uri)).await?;
        FOLLOWERS_TOTAL.set(self.count().await? as i64);
        tracing::info!(actor = %actor_uri, "Follower removed");
        Ok(())
    }

    /// Snapshot of all followers, ordered by actor URI.
    ///
    /// Records that no longer decode are skipped with a warning rather than
    /// failing the whole listing.
    pub async fn list_all(&self) -> Result<Vec<Follower>> {
        let entries = self.store.list_prefix(FOLLOWER_PREFIX).await?;

        let mut followers = Vec::with_capacity(entries.len());
        for (key, bytes) in entries {
            match serde_json::from_slice::<Follower>(&bytes) {
                Ok(follower) => followers.push(follower),
                Err(error) => {
                    tracing::warn!(%key, %error, "Skipping undecodable follower record");
                }
            }
        }
        Ok(followers)
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count_prefix(FOLLOWER_PREFIX).await
    }
}

fn storage_key(actor_uri: &str) -> String {
    format!("{}{}", FOLLOWER_PREFIX, actor_uri)
}
