//! Inbound activity processing
//!
//! Consumes subscription-protocol messages (Follow, Undo-of-Follow) and keeps
//! the follower directory in sync. Everything else arriving at the inbox is
//! ignored by design; the protocol has no channel for reporting invalid
//! activities back to an untrusted sender.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{EntityId, Follower};
use crate::error::Result;
use crate::followers::FollowerDirectory;
use crate::metrics::{ACTIVITIES_RECEIVED_TOTAL, ACTIVITIES_SENT_TOTAL};
use crate::uris::UriTemplates;

use super::delivery::DeliveryService;
use super::resolver::ActorResolver;
use super::translate::builder;

/// Closed set of inbound activity shapes this core reacts to
///
/// Produced by `parse_inbound`; anything structurally incomplete or of an
/// unhandled kind collapses into `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundActivity {
    Follow {
        /// Follow activity URI
        id: String,
        /// Remote actor URI
        actor: String,
        /// Followed object URI (must be the local actor)
        object: String,
    },
    UndoFollow {
        /// Remote actor URI (key for removal)
        actor: String,
        /// Target of the wrapped Follow
        object: String,
        /// Wrapped Follow activity URI, when present
        follow_id: Option<String>,
    },
    Other,
}

/// Parse a raw activity document into the closed inbound variant.
///
/// A Follow must carry id, actor, and object; an Undo must wrap a Follow
/// with actor and target. Anything short of that is `Other`.
pub fn parse_inbound(activity: &serde_json::Value) -> InboundActivity {
    let activity_type = activity.get("type").and_then(serde_json::Value::as_str);

    match activity_type {
        Some("Follow") => {
            let id = activity.get("id").and_then(serde_json::Value::as_str);
            let actor = activity.get("actor").and_then(serde_json::Value::as_str);
            let object = extract_object_uri(activity.get("object"));

            match (id, actor, object) {
                (Some(id), Some(actor), Some(object)) => InboundActivity::Follow {
                    id: id.to_string(),
                    actor: actor.to_string(),
                    object,
                },
                _ => InboundActivity::Other,
            }
        }
        Some("Undo") => {
            let actor = activity.get("actor").and_then(serde_json::Value::as_str);
            let wrapped = activity.get("object");

            let wrapped_is_follow = wrapped
                .and_then(|object| object.get("type"))
                .and_then(serde_json::Value::as_str)
                == Some("Follow");

            let target = wrapped.and_then(|object| extract_object_uri(object.get("object")));

            match (actor, wrapped_is_follow, target) {
                (Some(actor), true, Some(object)) => InboundActivity::UndoFollow {
                    actor: actor.to_string(),
                    object,
                    follow_id: wrapped
                        .and_then(|object| object.get("id"))
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string),
                },
                _ => InboundActivity::Other,
            }
        }
        _ => InboundActivity::Other,
    }
}

/// Accept either a plain URI or an embedded object with an `id`.
fn extract_object_uri(object: Option<&serde_json::Value>) -> Option<String> {
    let object = object?;
    object
        .as_str()
        .or_else(|| object.get("id").and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

/// Inbound subscription state machine
///
/// Per (remote actor, local actor) pair: NotSubscribed -> Subscribed on an
/// accepted Follow, back on a matching Undo. Acceptance is synchronous and
/// unconditional once validation passes; there is no pending state and no
/// Reject path.
pub struct InboxProcessor {
    uris: Arc<UriTemplates>,
    directory: Arc<FollowerDirectory>,
    resolver: Arc<dyn ActorResolver>,
    delivery: Arc<DeliveryService>,
}

impl InboxProcessor {
    pub fn new(
        uris: Arc<UriTemplates>,
        directory: Arc<FollowerDirectory>,
        resolver: Arc<dyn ActorResolver>,
        delivery: Arc<DeliveryService>,
    ) -> Self {
        Self {
            uris,
            directory,
            resolver,
            delivery,
        }
    }

    /// Process one inbound activity.
    ///
    /// Protocol-validation failures and resolution failures are policy
    /// no-ops; only infrastructure errors (directory persistence) propagate.
    pub async fn handle(&self, activity: &serde_json::Value) -> Result<()> {
        match parse_inbound(activity) {
            InboundActivity::Follow { id, actor, object } => {
                self.handle_follow(&id, &actor, &object).await
            }
            InboundActivity::UndoFollow { actor, object, .. } => {
                self.handle_undo_follow(&actor, &object).await
            }
            InboundActivity::Other => {
                ACTIVITIES_RECEIVED_TOTAL
                    .with_label_values(&["other", "ignored"])
                    .inc();
                tracing::debug!("Ignoring unhandled or malformed inbound activity");
                Ok(())
            }
        }
    }

    async fn handle_follow(&self, follow_id: &str, actor: &str, object: &str) -> Result<()> {
        if !self.uris.is_local_actor(object) {
            ACTIVITIES_RECEIVED_TOTAL
                .with_label_values(&["Follow", "ignored"])
                .inc();
            tracing::debug!(%object, "Follow target is not the local actor, ignoring");
            return Ok(());
        }

        // No partial follower: endpoints must resolve before anything is recorded.
        let remote = match self.resolver.resolve(actor).await {
            Ok(remote) => remote,
            Err(error) => {
                ACTIVITIES_RECEIVED_TOTAL
                    .with_label_values(&["Follow", "unresolvable"])
                    .inc();
                tracing::debug!(%actor, %error, "Dropping Follow from unresolvable actor");
                return Ok(());
            }
        };

        self.directory
            .add(&Follower {
                actor_uri: actor.to_string(),
                inbox: remote.inbox.clone(),
                shared_inbox: remote.shared_inbox.clone(),
                followed_at: Utc::now(),
            })
            .await?;

        ACTIVITIES_RECEIVED_TOTAL
            .with_label_values(&["Follow", "accepted"])
            .inc();

        let accept = builder::accept(
            &self.uris.activity_uri("accept", &EntityId::new().0),
            &self.uris.actor_uri(),
            serde_json::json!({
                "type": "Follow",
                "id": follow_id,
                "actor": actor,
                "object": object
            }),
        );

        let reply_inbox = remote.inbox.as_deref().or(remote.shared_inbox.as_deref());
        match reply_inbox {
            Some(inbox) => match self.delivery.deliver_to_inbox(inbox, accept).await {
                Ok(()) => {
                    ACTIVITIES_SENT_TOTAL.with_label_values(&["Accept"]).inc();
                    tracing::info!(%actor, %inbox, "Sent Accept for Follow");
                }
                Err(error) => {
                    // The follower stays recorded even when the Accept fails.
                    tracing::error!(%actor, %inbox, %error, "Failed to send Accept");
                }
            },
            None => {
                tracing::warn!(%actor, "No inbox to send Accept to");
            }
        }

        Ok(())
    }

    async fn handle_undo_follow(&self, actor: &str, object: &str) -> Result<()> {
        if !self.uris.is_local_actor(object) {
            ACTIVITIES_RECEIVED_TOTAL
                .with_label_values(&["Undo", "ignored"])
                .inc();
            tracing::debug!(%object, "Undo Follow target is not the local actor, ignoring");
            return Ok(());
        }

        self.directory.remove(actor).await?;
        ACTIVITIES_RECEIVED_TOTAL
            .with_label_values(&["Undo", "accepted"])
            .inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use crate::error::AppError;
    use crate::federation::delivery::MockTransport;
    use crate::federation::resolver::{MockActorResolver, RemoteActor};
    use serde_json::json;

    const LOCAL_ACTOR: &str = "https://photos.example.com/users/gallery";
    const REMOTE_ACTOR: &str = "https://remote.example/users/bob";

    struct Harness {
        processor: InboxProcessor,
        directory: Arc<FollowerDirectory>,
    }

    fn harness(resolver: MockActorResolver, transport: MockTransport) -> Harness {
        let uris = Arc::new(UriTemplates::new("https://photos.example.com", "gallery"));
        let directory = Arc::new(FollowerDirectory::new(Arc::new(MemoryStore::new())));
        let processor = InboxProcessor::new(
            uris,
            directory.clone(),
            Arc::new(resolver),
            Arc::new(DeliveryService::new(Arc::new(transport), 4)),
        );
        Harness {
            processor,
            directory,
        }
    }

    fn resolvable_remote() -> MockActorResolver {
        let mut resolver = MockActorResolver::new();
        resolver.expect_resolve().returning(|_| {
            Ok(RemoteActor {
                inbox: Some(format!("{}/inbox", REMOTE_ACTOR)),
                shared_inbox: Some("https://remote.example/inbox".to_string()),
            })
        });
        resolver
    }

    fn follow_activity() -> serde_json::Value {
        json!({
            "type": "Follow",
            "id": "https://remote.example/follows/1",
            "actor": REMOTE_ACTOR,
            "object": LOCAL_ACTOR
        })
    }

    #[test]
    fn parse_inbound_classifies_follow_and_undo() {
        assert!(matches!(
            parse_inbound(&follow_activity()),
            InboundActivity::Follow { .. }
        ));

        let undo = json!({
            "type": "Undo",
            "actor": REMOTE_ACTOR,
            "object": {
                "type": "Follow",
                "id": "https://remote.example/follows/1",
                "object": LOCAL_ACTOR
            }
        });
        assert_eq!(
            parse_inbound(&undo),
            InboundActivity::UndoFollow {
                actor: REMOTE_ACTOR.to_string(),
                object: LOCAL_ACTOR.to_string(),
                follow_id: Some("https://remote.example/follows/1".to_string()),
            }
        );
    }

    #[test]
    fn parse_inbound_collapses_incomplete_shapes_to_other() {
        // Follow without an id.
        let no_id = json!({
            "type": "Follow",
            "actor": REMOTE_ACTOR,
            "object": LOCAL_ACTOR
        });
        assert_eq!(parse_inbound(&no_id), InboundActivity::Other);

        // Undo wrapping something that is not a Follow.
        let undo_like = json!({
            "type": "Undo",
            "actor": REMOTE_ACTOR,
            "object": { "type": "Like", "object": LOCAL_ACTOR }
        });
        assert_eq!(parse_inbound(&undo_like), InboundActivity::Other);

        assert_eq!(
            parse_inbound(&json!({"type": "Announce"})),
            InboundActivity::Other
        );
        assert_eq!(parse_inbound(&json!({})), InboundActivity::Other);
    }

    #[test]
    fn parse_inbound_accepts_object_id_form() {
        let activity = json!({
            "type": "Follow",
            "id": "https://remote.example/follows/2",
            "actor": REMOTE_ACTOR,
            "object": { "id": LOCAL_ACTOR }
        });
        match parse_inbound(&activity) {
            InboundActivity::Follow { object, .. } => assert_eq!(object, LOCAL_ACTOR),
            other => panic!("expected Follow, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn valid_follow_records_follower_and_sends_one_accept() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .withf(|inbox, activity| {
                inbox == format!("{}/inbox", REMOTE_ACTOR)
                    && activity["type"] == "Accept"
                    && activity["object"]["type"] == "Follow"
                    && activity["object"]["id"] == "https://remote.example/follows/1"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let harness = harness(resolvable_remote(), transport);
        harness.processor.handle(&follow_activity()).await.unwrap();

        let followers = harness.directory.list_all().await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].actor_uri, REMOTE_ACTOR);
        assert_eq!(
            followers[0].shared_inbox.as_deref(),
            Some("https://remote.example/inbox")
        );
    }

    #[tokio::test]
    async fn follow_for_foreign_actor_changes_nothing() {
        let resolver = MockActorResolver::new(); // must never be called
        let transport = MockTransport::new(); // must never be called
        let harness = harness(resolver, transport);

        let activity = json!({
            "type": "Follow",
            "id": "https://remote.example/follows/1",
            "actor": REMOTE_ACTOR,
            "object": "https://photos.example.com/users/somebody-else"
        });

        harness.processor.handle(&activity).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unresolvable_actor_leaves_no_partial_follower() {
        let mut resolver = MockActorResolver::new();
        resolver
            .expect_resolve()
            .returning(|_| Err(AppError::Resolution("HTTP 404".to_string())));
        let harness = harness(resolver, MockTransport::new());

        harness.processor.handle(&follow_activity()).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn accept_delivery_failure_keeps_the_follower() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .times(1)
            .returning(|_, _| Err(AppError::Delivery("HTTP 502".to_string())));

        let harness = harness(resolvable_remote(), transport);
        harness.processor.handle(&follow_activity()).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn undo_follow_removes_follower_without_delivery() {
        let mut transport = MockTransport::new();
        transport.expect_deliver().times(1).returning(|_, _| Ok(()));
        let harness = harness(resolvable_remote(), transport);

        harness.processor.handle(&follow_activity()).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 1);

        let undo = json!({
            "type": "Undo",
            "actor": REMOTE_ACTOR,
            "object": {
                "type": "Follow",
                "id": "https://remote.example/follows/1",
                "object": LOCAL_ACTOR
            }
        });
        harness.processor.handle(&undo).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn undo_for_foreign_target_is_ignored() {
        let mut transport = MockTransport::new();
        transport.expect_deliver().times(1).returning(|_, _| Ok(()));
        let harness = harness(resolvable_remote(), transport);

        harness.processor.handle(&follow_activity()).await.unwrap();

        let undo = json!({
            "type": "Undo",
            "actor": REMOTE_ACTOR,
            "object": {
                "type": "Follow",
                "object": "https://photos.example.com/users/somebody-else"
            }
        });
        harness.processor.handle(&undo).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unrelated_activity_kinds_are_ignored() {
        let harness = harness(MockActorResolver::new(), MockTransport::new());
        let like = json!({
            "type": "Like",
            "actor": REMOTE_ACTOR,
            "object": "https://photos.example.com/users/gallery/photos/01ABC"
        });
        harness.processor.handle(&like).await.unwrap();
        assert_eq!(harness.directory.count().await.unwrap(), 0);
    }
}
