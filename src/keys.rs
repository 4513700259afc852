//! Actor key material
//!
//! The key vault owns generation, persistence, and retrieval of the actor's
//! RSA signing key pair. The key pair is generated lazily on first access and
//! persisted (PKCS#8 PEM) before it is ever used; after that it is immutable.

use std::sync::Arc;

use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::data::{KeyValueStore, StoredKeyPair};
use crate::error::{AppError, Result};

const KEY_PREFIX: &str = "key:";
const RSA_BITS: usize = 2048;

/// Owns the actor's asymmetric key material
pub struct KeyVault {
    store: Arc<dyn KeyValueStore>,
}

impl KeyVault {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Return the stored key pair for `handle`, generating and persisting one
    /// on first access.
    ///
    /// Safe under a concurrent first-call race: the store's conditional write
    /// keeps the first generated pair and losing callers re-read it, so one
    /// key pair is ever persisted per handle.
    pub async fn get_or_create_key_pair(&self, handle: &str) -> Result<StoredKeyPair> {
        let key = format!("{}{}", KEY_PREFIX, handle);

        if let Some(bytes) = self.store.get(&key).await? {
            return parse_stored(&bytes);
        }

        tracing::info!(handle = %handle, "Generating actor key pair");
        let generated = generate_key_pair()?;
        let encoded = serde_json::to_vec(&generated)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode key pair: {}", e)))?;

        let stored = self.store.put_if_absent(&key, &encoded).await?;
        parse_stored(&stored)
    }
}

fn parse_stored(bytes: &[u8]) -> Result<StoredKeyPair> {
    let pair: StoredKeyPair = serde_json::from_slice(bytes)
        .map_err(|e| AppError::KeyMaterialCorrupt(e.to_string()))?;

    // The PEM must still round-trip; truncated or garbled material is fatal.
    RsaPrivateKey::from_pkcs8_pem(&pair.private_key_pem)
        .map_err(|e| AppError::KeyMaterialCorrupt(e.to_string()))?;

    Ok(pair)
}

fn generate_key_pair() -> Result<StoredKeyPair> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, RSA_BITS)
        .map_err(|e| AppError::Internal(e.into()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(e.into()))?
        .to_string();
    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(StoredKeyPair {
        private_key_pem,
        public_key_pem,
        created_at: chrono::Utc::now(),
    })
}
