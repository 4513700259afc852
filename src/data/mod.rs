//! Data layer
//!
//! - `models`: entity structs shared across the crate
//! - `store`: key-value persistence (SQLite + in-memory)
//! - `photos`: read-only photo repository interface

mod models;
mod photos;
mod store;

pub use models::{EntityId, Follower, PhotoRecord, StoredKeyPair};
pub use photos::{MemoryPhotoRepository, PhotoRepository};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
