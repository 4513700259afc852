//! Federation: inbound subscription handling and outbound distribution

pub mod delivery;
pub mod inbox;
pub mod outbox;
pub mod resolver;
pub mod signature;
pub mod translate;

pub use delivery::{DeliveryResult, DeliveryService, HttpTransport, Transport, follower_inbox_uris};
pub use inbox::{InboundActivity, InboxProcessor, parse_inbound};
pub use outbox::{OutboxCatalog, OutboxPage, OutboxPublisher, PAGE_SIZE};
pub use resolver::{ActorResolver, HttpActorResolver, RemoteActor};
pub use signature::{SignatureHeaders, sign_request};
pub use translate::{ContentTranslator, PUBLIC_AUDIENCE};
