//! Actor profile
//!
//! Produces the public actor descriptor for the single configured actor.

use std::sync::Arc;

use serde::Serialize;

use crate::config::ActorConfig;
use crate::error::{AppError, Result};
use crate::keys::KeyVault;
use crate::uris::UriTemplates;

/// Public description of the local actor
#[derive(Debug, Clone, Serialize)]
pub struct ActorDescriptor {
    pub handle: String,
    pub display_name: String,
    pub summary: Option<String>,
    pub actor_uri: String,
    pub inbox: String,
    pub outbox: String,
    pub followers: String,
    pub public_key_id: String,
    pub public_key_pem: String,
}

impl ActorDescriptor {
    /// Render as an ActivityPub Person document.
    pub fn to_activity_json(&self) -> serde_json::Value {
        serde_json::json!({
            "@context": [
                "https://www.w3.org/ns/activitystreams",
                "https://w3id.org/security/v1"
            ],
            "type": "Person",
            "id": self.actor_uri,
            "preferredUsername": self.handle,
            "name": self.display_name,
            "summary": self.summary.clone().unwrap_or_default(),
            "inbox": self.inbox,
            "outbox": self.outbox,
            "followers": self.followers,
            "url": self.actor_uri,
            "publicKey": {
                "id": self.public_key_id,
                "owner": self.actor_uri,
                "publicKeyPem": self.public_key_pem
            }
        })
    }
}

/// Builds actor descriptors on demand
pub struct ActorProfile {
    actor: ActorConfig,
    uris: Arc<UriTemplates>,
    keys: Arc<KeyVault>,
}

impl ActorProfile {
    pub fn new(actor: ActorConfig, uris: Arc<UriTemplates>, keys: Arc<KeyVault>) -> Self {
        Self { actor, uris, keys }
    }

    /// Describe the actor behind `handle`.
    ///
    /// Exactly one actor exists; any other handle is `NotFound`. No aliasing,
    /// no case folding.
    pub async fn describe(&self, handle: &str) -> Result<ActorDescriptor> {
        if handle != self.actor.handle {
            return Err(AppError::NotFound);
        }

        let key_pair = self.keys.get_or_create_key_pair(handle).await?;

        Ok(ActorDescriptor {
            handle: self.actor.handle.clone(),
            display_name: self.actor.display_name.clone(),
            summary: self.actor.summary.clone(),
            actor_uri: self.uris.actor_uri(),
            inbox: self.uris.inbox_uri(),
            outbox: self.uris.outbox_uri(),
            followers: self.uris.followers_uri(),
            public_key_id: self.uris.key_id(),
            public_key_pem: key_pair.public_key_pem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;

    fn profile() -> ActorProfile {
        let store = Arc::new(MemoryStore::new());
        ActorProfile::new(
            ActorConfig {
                handle: "gallery".to_string(),
                display_name: "Gallery".to_string(),
                summary: Some("Photographs".to_string()),
            },
            Arc::new(UriTemplates::new("https://photos.example.com", "gallery")),
            Arc::new(KeyVault::new(store)),
        )
    }

    #[tokio::test]
    async fn describe_unknown_handle_is_not_found() {
        let profile = profile();
        assert!(matches!(
            profile.describe("other").await,
            Err(AppError::NotFound)
        ));
        // No case aliasing either.
        assert!(matches!(
            profile.describe("Gallery").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn describe_configured_handle_builds_descriptor() {
        let profile = profile();
        let descriptor = profile.describe("gallery").await.unwrap();

        assert_eq!(
            descriptor.actor_uri,
            "https://photos.example.com/users/gallery"
        );
        assert_eq!(
            descriptor.followers,
            "https://photos.example.com/users/gallery/followers"
        );
        assert!(descriptor.public_key_pem.contains("PUBLIC KEY"));

        let document = descriptor.to_activity_json();
        assert_eq!(document["type"], "Person");
        assert_eq!(document["preferredUsername"], "gallery");
        assert_eq!(
            document["publicKey"]["id"],
            "https://photos.example.com/users/gallery#main-key"
        );
        // The private half must never appear in the outward document.
        assert!(!document.to_string().contains("PRIVATE"));
    }
}
