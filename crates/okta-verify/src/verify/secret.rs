//! Secret store: the single slot holding the current seed.
//!
//! The seed is kept Base64-encoded. Raw bytes only leave the store through
//! [`SecretStore::decode`], and come back wrapped in [`Zeroizing`].
//! Writers swap the whole slot under the write lock, so a concurrent reader
//! sees either the previous or the new value, never a mix.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use crate::verify::types::*;

#[derive(Default)]
pub struct SecretStore {
    encoded: RwLock<Option<String>>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a seed, or clear the slot when `secret` is blank.
    ///
    /// Clearing is an intentional reset, not an error.
    pub fn set(&self, secret: &str) {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            *self.write() = None;
            log::warn!("Shared secret cleared.");
        } else {
            *self.write() = Some(STANDARD.encode(trimmed.as_bytes()));
            log::info!("Shared secret updated.");
        }
    }

    /// Store the seed issued by an enrollment.
    pub fn set_shared_secret(&self, secret: &SharedSecret) {
        self.set(secret.expose());
    }

    pub fn clear(&self) {
        self.set("");
    }

    /// Raw seed bytes.
    pub fn decode(&self) -> Result<Zeroizing<Vec<u8>>, VerifyError> {
        let guard = self.read();
        let encoded = match guard.as_deref() {
            Some(e) if !e.is_empty() => e,
            _ => return Err(VerifyError::Unset),
        };
        STANDARD
            .decode(encoded)
            .map(Zeroizing::new)
            .map_err(|e| VerifyError::DecodeError(e.to_string()))
    }

    /// Encoded form for display, empty while unset.
    pub fn current_encoded(&self) -> String {
        self.read().clone().unwrap_or_default()
    }

    pub fn is_set(&self) -> bool {
        self.read().is_some()
    }

    /// Put an already-encoded value in the slot as-is. Used to restore a
    /// value shown by [`current_encoded`](Self::current_encoded); the value
    /// is not validated until the next decode.
    pub fn restore_encoded(&self, encoded: &str) {
        let trimmed = encoded.trim();
        *self.write() = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.encoded.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.encoded.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("set", &self.is_set())
            .finish()
    }
}
