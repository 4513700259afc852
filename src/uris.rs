//! Deterministic URI templates
//!
//! Every address this core hands out derives from the public base URL and
//! the configured actor handle. The functions here are pure; the same input
//! always produces the same URI.

/// URI template set for the single local actor
#[derive(Debug, Clone)]
pub struct UriTemplates {
    base_url: String,
    handle: String,
}

impl UriTemplates {
    /// `base_url` must carry no trailing slash (e.g. "https://photos.example.com").
    pub fn new(base_url: &str, handle: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            handle: handle.to_string(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn actor_uri(&self) -> String {
        format!("{}/users/{}", self.base_url, self.handle)
    }

    pub fn inbox_uri(&self) -> String {
        format!("{}/inbox", self.actor_uri())
    }

    pub fn outbox_uri(&self) -> String {
        format!("{}/outbox", self.actor_uri())
    }

    pub fn followers_uri(&self) -> String {
        format!("{}/followers", self.actor_uri())
    }

    /// Key ID used in signature headers.
    pub fn key_id(&self) -> String {
        format!("{}#main-key", self.actor_uri())
    }

    /// URI of the note object for one photo.
    pub fn object_uri(&self, photo_id: &str) -> String {
        format!("{}/photos/{}", self.actor_uri(), photo_id)
    }

    /// Fresh, unique activity URI of the given kind ("create", "accept", ...).
    pub fn activity_uri(&self, kind: &str, nonce: &str) -> String {
        format!("{}/{}/{}", self.actor_uri(), kind, nonce)
    }

    /// Whether `uri` addresses this actor. Exact match on the actor URI
    /// (with optional trailing slash); no aliasing.
    pub fn is_local_actor(&self, uri: &str) -> bool {
        uri.trim_end_matches('/') == self.actor_uri()
    }
}
