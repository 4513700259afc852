//! Content translation
//!
//! Deterministic mapping from photo records to ActivityPub objects: a Note
//! with an image attachment, wrapped in Create/Update/Delete activities.

use std::sync::Arc;

use crate::data::{EntityId, PhotoRecord};
use crate::uris::UriTemplates;

/// The ActivityStreams public audience collection
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Caption used when a photo carries no title
const UNTITLED_CAPTION: &str = "(untitled photograph)";

/// Maps photo records to protocol objects
pub struct ContentTranslator {
    uris: Arc<UriTemplates>,
}

impl ContentTranslator {
    pub fn new(uris: Arc<UriTemplates>) -> Self {
        Self { uris }
    }

    /// Build the Note object for one photo.
    ///
    /// Deterministic: the same record always yields the same note. Optional
    /// capture metadata contributes attachment properties only when present.
    pub fn to_note(&self, photo: &PhotoRecord) -> serde_json::Value {
        let content = photo
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(UNTITLED_CAPTION);

        let mut attachments = vec![serde_json::json!({
            "type": "Image",
            "mediaType": "image/jpeg",
            "url": photo.media_url,
            "name": content
        })];
        attachments.extend(capture_properties(photo));

        serde_json::json!({
            "type": "Note",
            "id": self.uris.object_uri(&photo.id),
            "attributedTo": self.uris.actor_uri(),
            "content": content,
            "published": photo.created_at.to_rfc3339(),
            "updated": photo.updated_at.to_rfc3339(),
            "to": [PUBLIC_AUDIENCE],
            "cc": [self.uris.followers_uri()],
            "attachment": attachments
        })
    }

    /// Wrap the note in a Create activity with a fresh activity id.
    pub fn to_create(&self, photo: &PhotoRecord) -> serde_json::Value {
        self.wrap(
            "Create",
            "create",
            self.to_note(photo),
            photo.created_at.to_rfc3339(),
        )
    }

    /// Update activity carrying the refreshed note, stamped now.
    pub fn to_update(&self, photo: &PhotoRecord) -> serde_json::Value {
        self.wrap(
            "Update",
            "update",
            self.to_note(photo),
            chrono::Utc::now().to_rfc3339(),
        )
    }

    /// Delete activity referencing the note by Tombstone only.
    ///
    /// The deleted object's body is never re-sent, so this needs nothing but
    /// the photo id.
    pub fn to_delete(&self, photo_id: &str) -> serde_json::Value {
        self.wrap(
            "Delete",
            "delete",
            serde_json::json!({
                "type": "Tombstone",
                "id": self.uris.object_uri(photo_id)
            }),
            chrono::Utc::now().to_rfc3339(),
        )
    }

    fn wrap(
        &self,
        activity_type: &str,
        kind: &str,
        object: serde_json::Value,
        published: String,
    ) -> serde_json::Value {
        serde_json::json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": activity_type,
            "id": self.uris.activity_uri(kind, &EntityId::new().0),
            "actor": self.uris.actor_uri(),
            "object": object,
            "to": [PUBLIC_AUDIENCE],
            "cc": [self.uris.followers_uri()],
            "published": published
        })
    }
}

/// Capture metadata as PropertyValue attachments, display-string coerced.
/// Absent values contribute no entry.
fn capture_properties(photo: &PhotoRecord) -> Vec<serde_json::Value> {
    let mut properties = Vec::new();

    if let Some(seconds) = photo.exposure_seconds {
        properties.push(property("Exposure", format_exposure(seconds)));
    }
    if let Some(f_number) = photo.aperture_f {
        properties.push(property("Aperture", format!("f/{}", f_number)));
    }
    if let Some(millimeters) = photo.focal_length_mm {
        properties.push(property("Focal length", format!("{}mm", millimeters)));
    }
    if let Some(iso) = photo.iso {
        properties.push(property("ISO", iso.to_string()));
    }

    properties
}

fn property(name: &str, value: String) -> serde_json::Value {
    serde_json::json!({
        "type": "PropertyValue",
        "name": name,
        "value": value
    })
}

/// Shutter speeds render fractional below one second ("1/250s"), plain above.
fn format_exposure(seconds: f64) -> String {
    if seconds >= 1.0 || seconds <= 0.0 {
        format!("{}s", seconds)
    } else {
        format!("1/{}s", (1.0 / seconds).round() as u64)
    }
}

/// Build protocol reply activities (not derived from photos)
pub mod builder {
    use serde_json::Value;

    /// Build an Accept activity
    ///
    /// # Arguments
    /// * `id` - Activity ID (unique URI)
    /// * `actor` - Actor URI (accepter)
    /// * `object` - Original activity being accepted (usually a Follow)
    pub fn accept(id: &str, actor: &str, object: Value) -> Value {
        serde_json::json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Accept",
            "id": id,
            "actor": actor,
            "object": object
        })
    }
}
