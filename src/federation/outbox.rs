//! Outbound publishing
//!
//! Turns photo lifecycle events into activities fanned out to the follower
//! audience, and serves the paged public outbox collection.

use std::sync::Arc;

use crate::data::PhotoRepository;
use crate::error::Result;
use crate::followers::FollowerDirectory;
use crate::metrics::ACTIVITIES_SENT_TOTAL;

use super::delivery::{DeliveryResult, DeliveryService, follower_inbox_uris};
use super::translate::ContentTranslator;

/// Public outbox page size
pub const PAGE_SIZE: usize = 20;

/// Fans photo lifecycle events out to followers
pub struct OutboxPublisher {
    repository: Arc<dyn PhotoRepository>,
    translator: Arc<ContentTranslator>,
    directory: Arc<FollowerDirectory>,
    delivery: Arc<DeliveryService>,
}

impl OutboxPublisher {
    pub fn new(
        repository: Arc<dyn PhotoRepository>,
        translator: Arc<ContentTranslator>,
        directory: Arc<FollowerDirectory>,
        delivery: Arc<DeliveryService>,
    ) -> Self {
        Self {
            repository,
            translator,
            directory,
            delivery,
        }
    }

    /// Announce a newly published photo with a Create activity.
    pub async fn on_photo_created(&self, photo_id: &str) -> Result<Vec<DeliveryResult>> {
        let Some(photo) = self.visible_photo(photo_id, "Create").await? else {
            return Ok(Vec::new());
        };
        self.broadcast("Create", self.translator.to_create(&photo))
            .await
    }

    /// Announce an edited photo with an Update activity.
    pub async fn on_photo_updated(&self, photo_id: &str) -> Result<Vec<DeliveryResult>> {
        let Some(photo) = self.visible_photo(photo_id, "Update").await? else {
            return Ok(Vec::new());
        };
        self.broadcast("Update", self.translator.to_update(&photo))
            .await
    }

    /// Announce a removed photo with a Delete activity.
    ///
    /// Needs no record lookup: the Tombstone is derived from the id alone,
    /// which also covers records already gone from the repository.
    pub async fn on_photo_deleted(&self, photo_id: &str) -> Result<Vec<DeliveryResult>> {
        self.broadcast("Delete", self.translator.to_delete(photo_id))
            .await
    }

    /// Look up the photo, skipping the event when the record is missing or
    /// not publicly visible.
    async fn visible_photo(
        &self,
        photo_id: &str,
        activity_type: &str,
    ) -> Result<Option<crate::data::PhotoRecord>> {
        match self.repository.get_by_id(photo_id).await? {
            Some(photo) if photo.public => Ok(Some(photo)),
            Some(_) => {
                tracing::debug!(%photo_id, %activity_type, "Photo is not public, skipping broadcast");
                Ok(None)
            }
            None => {
                tracing::warn!(%photo_id, %activity_type, "Photo not found, skipping broadcast");
                Ok(None)
            }
        }
    }

    async fn broadcast(
        &self,
        activity_type: &str,
        activity: serde_json::Value,
    ) -> Result<Vec<DeliveryResult>> {
        let followers = self.directory.list_all().await?;
        let targets = follower_inbox_uris(&followers);

        ACTIVITIES_SENT_TOTAL
            .with_label_values(&[activity_type])
            .inc();
        tracing::info!(
            %activity_type,
            followers = followers.len(),
            "Broadcasting activity to followers"
        );

        Ok(self.delivery.fan_out(activity, targets).await)
    }
}

/// One page of the public outbox
#[derive(Debug, Clone)]
pub struct OutboxPage {
    /// Create activities for public photos, newest first
    pub items: Vec<serde_json::Value>,
    /// Cursor for the next page, absent on the last page
    pub next_cursor: Option<usize>,
}

/// Read-only paged view over the published history
pub struct OutboxCatalog {
    repository: Arc<dyn PhotoRepository>,
    translator: Arc<ContentTranslator>,
}

impl OutboxCatalog {
    pub fn new(repository: Arc<dyn PhotoRepository>, translator: Arc<ContentTranslator>) -> Self {
        Self {
            repository,
            translator,
        }
    }

    /// Total number of public photos.
    pub async fn count(&self) -> Result<u64> {
        self.repository.count_public().await
    }

    /// One page of Create activities, newest first. `cursor` is the offset of
    /// the first item; `None` starts at the top. A cursor past the end yields
    /// an empty final page.
    pub async fn list_page(&self, cursor: Option<usize>) -> Result<OutboxPage> {
        let offset = cursor.unwrap_or(0);
        let public = self.repository.list_public().await?;

        let items: Vec<serde_json::Value> = public
            .iter()
            .skip(offset)
            .take(PAGE_SIZE)
            .map(|photo| self.translator.to_create(photo))
            .collect();

        let next_cursor = if offset + items.len() < public.len() {
            Some(offset + items.len())
        } else {
            None
        };

        Ok(OutboxPage { items, next_cursor })
    }
}
