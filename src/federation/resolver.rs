//! Remote actor resolution
//!
//! Fetches a remote actor document to learn its delivery endpoints before a
//! Follow is accepted.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// Delivery endpoints of a remote actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteActor {
    /// Personal inbox URI
    pub inbox: Option<String>,
    /// Shared (instance-wide) inbox URI
    pub shared_inbox: Option<String>,
}

/// Remote-actor resolver collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// Resolve `actor_uri` to its inbox endpoints.
    async fn resolve(&self, actor_uri: &str) -> Result<RemoteActor>;
}

/// HTTP resolver fetching the actor document as activity+json
pub struct HttpActorResolver {
    http_client: Arc<reqwest::Client>,
}

impl HttpActorResolver {
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ActorResolver for HttpActorResolver {
    async fn resolve(&self, actor_uri: &str) -> Result<RemoteActor> {
        let response = self
            .http_client
            .get(actor_uri)
            .header("Accept", "application/activity+json")
            .send()
            .await
            .map_err(|e| AppError::Resolution(format!("Failed to fetch {}: {}", actor_uri, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Resolution(format!(
                "Actor fetch {} returned HTTP {}",
                actor_uri,
                response.status()
            )));
        }

        let document: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Resolution(format!("Invalid actor document: {}", e)))?;

        let actor = parse_actor_document(&document);
        if actor.inbox.is_none() && actor.shared_inbox.is_none() {
            return Err(AppError::Resolution(format!(
                "Actor document {} carries no inbox",
                actor_uri
            )));
        }

        Ok(actor)
    }
}

/// Extract inbox endpoints from an actor document.
fn parse_actor_document(document: &serde_json::Value) -> RemoteActor {
    let inbox = document
        .get("inbox")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    let shared_inbox = document
        .get("endpoints")
        .and_then(|endpoints| endpoints.get("sharedInbox"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    RemoteActor {
        inbox,
        shared_inbox,
    }
}
