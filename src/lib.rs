//! lenspub - federation core for a single-actor photo publisher
//!
//! Implements the ActivityPub side of a personal photo site: one configured
//! actor, a follower directory fed by inbound Follow/Undo activities, and
//! Create/Update/Delete broadcasts for photo lifecycle events. The HTTP
//! server and the photo storage engine live in the embedding application;
//! this crate exposes the processing core behind explicit collaborator
//! traits ([`data::PhotoRepository`], [`federation::Transport`],
//! [`federation::ActorResolver`]).

pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod followers;
pub mod keys;
pub mod metrics;
pub mod profile;
pub mod uris;

use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;
use data::{KeyValueStore, PhotoRepository, SqliteStore};
use error::Result;
use federation::{
    ActorResolver, ContentTranslator, DeliveryService, HttpActorResolver, HttpTransport,
    InboxProcessor, OutboxCatalog, OutboxPublisher, Transport,
};
use followers::FollowerDirectory;
use keys::KeyVault;
use profile::ActorProfile;
use uris::UriTemplates;

/// Fully wired processing core
///
/// Holds every collaborator explicitly; there are no module-level singletons
/// beyond the metrics registry. The embedding layer routes inbound requests
/// to `inbox`, content events to `outbox`, and collection reads to `catalog`
/// and `profile`.
pub struct PublisherCore {
    pub config: AppConfig,
    pub uris: Arc<UriTemplates>,
    pub keys: Arc<KeyVault>,
    pub profile: Arc<ActorProfile>,
    pub followers: Arc<FollowerDirectory>,
    pub translator: Arc<ContentTranslator>,
    pub delivery: Arc<DeliveryService>,
    pub inbox: Arc<InboxProcessor>,
    pub outbox: Arc<OutboxPublisher>,
    pub catalog: Arc<OutboxCatalog>,
}

impl PublisherCore {
    /// Wire a core from explicit collaborators.
    ///
    /// Used directly by tests and by embeddings that bring their own
    /// store, transport, or resolver; [`PublisherCore::bootstrap`] builds
    /// the production set.
    pub fn assemble(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        repository: Arc<dyn PhotoRepository>,
        resolver: Arc<dyn ActorResolver>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let uris = Arc::new(UriTemplates::new(
            &config.server.base_url(),
            &config.actor.handle,
        ));
        let keys = Arc::new(KeyVault::new(store.clone()));
        let profile = Arc::new(ActorProfile::new(
            config.actor.clone(),
            uris.clone(),
            keys.clone(),
        ));
        let followers = Arc::new(FollowerDirectory::new(store));
        let translator = Arc::new(ContentTranslator::new(uris.clone()));
        let delivery = Arc::new(DeliveryService::new(
            transport,
            config.delivery.max_concurrent,
        ));
        let inbox = Arc::new(InboxProcessor::new(
            uris.clone(),
            followers.clone(),
            resolver,
            delivery.clone(),
        ));
        let outbox = Arc::new(OutboxPublisher::new(
            repository.clone(),
            translator.clone(),
            followers.clone(),
            delivery.clone(),
        ));
        let catalog = Arc::new(OutboxCatalog::new(repository, translator.clone()));

        Self {
            config,
            uris,
            keys,
            profile,
            followers,
            translator,
            delivery,
            inbox,
            outbox,
            catalog,
        }
    }

    /// Build the production core: SQLite store, HTTP resolver, signed HTTP
    /// transport.
    ///
    /// The actor key pair is created on first boot here so the transport
    /// always signs with persisted material.
    pub async fn bootstrap(config: AppConfig, repository: Arc<dyn PhotoRepository>) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::connect(&config.database.path).await?);

        let http_client = Arc::new(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(config.delivery.timeout_seconds))
                .user_agent(concat!("lenspub/", env!("CARGO_PKG_VERSION")))
                .build()?,
        );

        let uris = UriTemplates::new(&config.server.base_url(), &config.actor.handle);
        let key_pair = KeyVault::new(store.clone())
            .get_or_create_key_pair(&config.actor.handle)
            .await?;

        let resolver: Arc<dyn ActorResolver> = Arc::new(HttpActorResolver::new(http_client.clone()));
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            http_client,
            uris.key_id(),
            key_pair.private_key_pem,
        ));

        Ok(Self::assemble(config, store, repository, resolver, transport))
    }
}
