//! Activity delivery
//!
//! Sends signed activities to remote inbox endpoints and fans one activity
//! out to a whole follower audience.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::data::Follower;
use crate::error::{AppError, Result};
use crate::metrics::DELIVERIES_TOTAL;

/// Inbox transport collaborator
///
/// One call is one delivery attempt; retry policy, if any, belongs to the
/// implementation behind this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, inbox_uri: &str, activity: serde_json::Value) -> Result<()>;
}

/// Signed HTTP transport
///
/// POSTs the activity as `application/activity+json` with RSA-SHA256 HTTP
/// signature headers.
pub struct HttpTransport {
    http_client: Arc<reqwest::Client>,
    /// Key ID for signatures
    key_id: String,
    /// Private key for signing
    private_key_pem: String,
}

impl HttpTransport {
    pub fn new(http_client: Arc<reqwest::Client>, key_id: String, private_key_pem: String) -> Self {
        Self {
            http_client,
            key_id,
            private_key_pem,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, inbox_uri: &str, activity: serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec(&activity)
            .map_err(|e| AppError::Validation(format!("Failed to serialize activity: {}", e)))?;

        let sig_headers = super::sign_request(
            "POST",
            inbox_uri,
            Some(&body),
            &self.private_key_pem,
            &self.key_id,
        )?;

        let mut request = self
            .http_client
            .post(inbox_uri)
            .header("Content-Type", "application/activity+json")
            .header("Date", sig_headers.date)
            .header("Signature", sig_headers.signature);

        if let Some(digest) = sig_headers.digest {
            request = request.header("Digest", digest);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("Failed to deliver to {}: {}", inbox_uri, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Delivery(format!(
                "Inbox {} rejected activity: HTTP {}",
                inbox_uri,
                response.status()
            )));
        }

        tracing::info!("Successfully delivered activity to {}", inbox_uri);
        Ok(())
    }
}

/// Result of a delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    /// Target inbox URI
    pub inbox_uri: String,
    /// Whether delivery succeeded
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}

/// Best-effort fan-out over a bounded worker set
pub struct DeliveryService {
    transport: Arc<dyn Transport>,
    max_concurrent: usize,
}

impl DeliveryService {
    pub fn new(transport: Arc<dyn Transport>, max_concurrent: usize) -> Self {
        Self {
            transport,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// One delivery attempt to a single inbox.
    pub async fn deliver_to_inbox(
        &self,
        inbox_uri: &str,
        activity: serde_json::Value,
    ) -> Result<()> {
        let result = self.transport.deliver(inbox_uri, activity).await;
        let status = if result.is_ok() { "success" } else { "failure" };
        DELIVERIES_TOTAL.with_label_values(&[status]).inc();
        result
    }

    /// Deliver one activity to every target inbox, one task per unique URI.
    ///
    /// Failures are isolated per target; the call resolves once every attempt
    /// has completed.
    pub async fn fan_out(
        &self,
        activity: serde_json::Value,
        inbox_uris: Vec<String>,
    ) -> Vec<DeliveryResult> {
        let total_targets = inbox_uris.len();
        let delivery_targets = unique_inbox_targets(inbox_uris);

        tracing::info!(
            "Delivering to {} unique inboxes (deduplicated from {} total)",
            delivery_targets.len(),
            total_targets
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let activity = Arc::new(activity);

        let mut tasks = Vec::new();
        for inbox_uri in delivery_targets {
            let semaphore = semaphore.clone();
            let activity = activity.clone();
            let transport = self.transport.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");

                let result = transport.deliver(&inbox_uri, (*activity).clone()).await;
                let status = if result.is_ok() { "success" } else { "failure" };
                DELIVERIES_TOTAL.with_label_values(&[status]).inc();

                if let Err(ref error) = result {
                    tracing::error!(inbox = %inbox_uri, %error, "Delivery failed");
                }

                DeliveryResult {
                    inbox_uri: inbox_uri.clone(),
                    success: result.is_ok(),
                    error: result.err().map(|e| e.to_string()),
                }
            }));
        }

        let results: Vec<DeliveryResult> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect();

        let success_count = results.iter().filter(|r| r.success).count();
        tracing::info!(
            "Batch delivery complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// Resolve the delivery target set for a follower audience.
///
/// Shared inbox preferred over personal inbox; followers with neither are
/// skipped with a warning. The returned list still needs URI deduplication.
pub fn follower_inbox_uris(followers: &[Follower]) -> Vec<String> {
    let mut targets = Vec::with_capacity(followers.len());
    for follower in followers {
        match follower.delivery_inbox() {
            Some(inbox) => targets.push(inbox.to_string()),
            None => {
                tracing::warn!(actor = %follower.actor_uri, "Follower has no resolvable inbox, skipping");
            }
        }
    }
    targets
}

/// Deduplicate identical inbox URIs while keeping distinct personal inboxes.
///
/// This preserves recipients on the same domain that use different inbox paths.
fn unique_inbox_targets(inbox_uris: Vec<String>) -> Vec<String> {
    use std::collections::HashSet;

    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for inbox_uri in inbox_uris {
        if seen.insert(inbox_uri.clone()) {
            targets.push(inbox_uri);
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;
    use serde_json::json;

    fn follower(actor: &str, inbox: Option<&str>, shared: Option<&str>) -> Follower {
        Follower {
            actor_uri: actor.to_string(),
            inbox: inbox.map(str::to_string),
            shared_inbox: shared.map(str::to_string),
            followed_at: Utc::now(),
        }
    }

    #[test]
    fn unique_inbox_targets_keeps_distinct_personal_inboxes_on_same_domain() {
        let targets = unique_inbox_targets(vec![
            "https://instance1.com/users/alice/inbox".to_string(),
            "https://instance1.com/users/bob/inbox".to_string(),
            "https://instance2.com/inbox".to_string(),
        ]);
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn unique_inbox_targets_deduplicates_identical_shared_inbox_uris() {
        let targets = unique_inbox_targets(vec![
            "https://instance1.com/inbox".to_string(),
            "https://instance1.com/inbox".to_string(),
            "https://instance2.com/inbox".to_string(),
        ]);
        assert_eq!(
            targets,
            vec![
                "https://instance1.com/inbox".to_string(),
                "https://instance2.com/inbox".to_string(),
            ]
        );
    }

    #[test]
    fn follower_inbox_uris_prefers_shared_and_skips_undeliverable() {
        let followers = vec![
            follower(
                "https://a.example/users/a",
                Some("https://a.example/users/a/inbox"),
                Some("https://a.example/inbox"),
            ),
            follower(
                "https://b.example/users/b",
                Some("https://b.example/users/b/inbox"),
                None,
            ),
            follower("https://c.example/users/c", None, None),
        ];

        assert_eq!(
            follower_inbox_uris(&followers),
            vec![
                "https://a.example/inbox".to_string(),
                "https://b.example/users/b/inbox".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn fan_out_delivers_once_per_unique_target() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .with(eq("https://instance1.com/inbox"), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));

        let service = DeliveryService::new(Arc::new(transport), 4);
        let results = service
            .fan_out(
                json!({"type": "Create"}),
                vec![
                    "https://instance1.com/inbox".to_string(),
                    "https://instance1.com/inbox".to_string(),
                ],
            )
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn fan_out_isolates_per_target_failures() {
        let mut transport = MockTransport::new();
        transport.expect_deliver().times(2).returning(|inbox, _| {
            if inbox.contains("bad") {
                Err(AppError::Delivery("HTTP 502".to_string()))
            } else {
                Ok(())
            }
        });

        let service = DeliveryService::new(Arc::new(transport), 4);
        let mut results = service
            .fan_out(
                json!({"type": "Create"}),
                vec![
                    "https://bad.example/inbox".to_string(),
                    "https://good.example/inbox".to_string(),
                ],
            )
            .await;

        results.sort_by(|a, b| a.inbox_uri.cmp(&b.inbox_uri));
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("HTTP 502"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn fan_out_with_no_targets_is_empty() {
        let transport = MockTransport::new();
        let service = DeliveryService::new(Arc::new(transport), 4);
        let results = service.fan_out(json!({}), Vec::new()).await;
        assert!(results.is_empty());
    }
}
