//! Data models
//!
//! Rust structs representing stored entities and the read-only photo
//! records this core consumes. All IDs are ULIDs, timestamps are chrono.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Followers
// =============================================================================

/// A remote actor subscribed to this publisher
///
/// Keyed uniquely by `actor_uri`; a re-follow replaces the whole record.
/// At least one of `inbox` / `shared_inbox` must resolve at delivery time,
/// otherwise the follower is undeliverable (logged, not fatal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    /// Remote actor URI (unique key)
    pub actor_uri: String,
    /// Personal inbox URI
    pub inbox: Option<String>,
    /// Shared inbox URI, preferred for delivery deduplication
    pub shared_inbox: Option<String>,
    pub followed_at: DateTime<Utc>,
}

impl Follower {
    /// Delivery target for this follower: shared inbox if present, else
    /// the personal inbox.
    pub fn delivery_inbox(&self) -> Option<&str> {
        self.shared_inbox.as_deref().or(self.inbox.as_deref())
    }
}

// =============================================================================
// Key material
// =============================================================================

/// Actor signing key pair in portable PEM form
///
/// The private half never leaves the key vault; the public half is embedded
/// in the actor document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeyPair {
    /// RSA private key (PKCS#8 PEM)
    pub private_key_pem: String,
    /// RSA public key (PEM)
    pub public_key_pem: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Photos (read-only content source)
// =============================================================================

/// One published photo, as provided by the photo repository
///
/// This core never owns or mutates photo records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    /// Photo title; empty or absent titles fall back to a fixed caption
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Hidden photos are never federated
    pub public: bool,
    /// URL of the full-size image
    pub media_url: String,
    /// Shutter speed in seconds
    pub exposure_seconds: Option<f64>,
    /// Aperture as f-number
    pub aperture_f: Option<f64>,
    pub focal_length_mm: Option<f64>,
    pub iso: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn delivery_inbox_prefers_shared_inbox() {
        let follower = Follower {
            actor_uri: "https://remote.example/users/bob".to_string(),
            inbox: Some("https://remote.example/users/bob/inbox".to_string()),
            shared_inbox: Some("https://remote.example/inbox".to_string()),
            followed_at: Utc::now(),
        };
        assert_eq!(
            follower.delivery_inbox(),
            Some("https://remote.example/inbox")
        );
    }

    #[test]
    fn delivery_inbox_falls_back_to_personal_inbox() {
        let follower = Follower {
            actor_uri: "https://remote.example/users/bob".to_string(),
            inbox: Some("https://remote.example/users/bob/inbox".to_string()),
            shared_inbox: None,
            followed_at: Utc::now(),
        };
        assert_eq!(
            follower.delivery_inbox(),
            Some("https://remote.example/users/bob/inbox")
        );
    }

    #[test]
    fn delivery_inbox_is_none_when_undeliverable() {
        let follower = Follower {
            actor_uri: "https://remote.example/users/bob".to_string(),
            inbox: None,
            shared_inbox: None,
            followed_at: Utc::now(),
        };
        assert_eq!(follower.delivery_inbox(), None);
    }
}
