//! Read-only photo repository interface
//!
//! The photo storage engine lives outside this crate; the core only reads
//! records through this trait. The in-memory implementation backs tests and
//! embedded setups where the host application already holds the records.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::data::PhotoRecord;
use crate::error::Result;

/// Read-only content source
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<PhotoRecord>>;

    /// All public photos, newest first.
    async fn list_public(&self) -> Result<Vec<PhotoRecord>>;

    async fn count_public(&self) -> Result<u64>;
}

/// In-memory photo repository
#[derive(Default)]
pub struct MemoryPhotoRepository {
    photos: RwLock<BTreeMap<String, PhotoRecord>>,
}

impl MemoryPhotoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, photo: PhotoRecord) {
        self.photos.write().await.insert(photo.id.clone(), photo);
    }

    pub async fn remove(&self, id: &str) {
        self.photos.write().await.remove(id);
    }
}

#[async_trait]
impl PhotoRepository for MemoryPhotoRepository {
    async fn get_by_id(&self, id: &str) -> Result<Option<PhotoRecord>> {
        Ok(self.photos.read().await.get(id).cloned())
    }

    async fn list_public(&self) -> Result<Vec<PhotoRecord>> {
        let mut public: Vec<PhotoRecord> = self
            .photos
            .read()
            .await
            .values()
            .filter(|photo| photo.public)
            .cloned()
            .collect();
        public.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(public)
    }

    async fn count_public(&self) -> Result<u64> {
        Ok(self
            .photos
            .read()
            .await
            .values()
            .filter(|photo| photo.public)
            .count() as u64)
    }
}
