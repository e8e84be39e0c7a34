use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::ResourceError;

/// Backing store for transient, locator-addressed output bytes.
///
/// Locators are what the surface renders and links to, in the same way a
/// browser object URL is. Revoking a locator that is unknown or was already
/// revoked is a bookkeeping bug and must be reported, not swallowed.
pub trait HandleProvider: Send + Sync {
    fn allocate(&self, bytes: Arc<[u8]>, media_type: &str) -> Result<String, ResourceError>;
    fn resolve(&self, locator: &str) -> Option<Arc<[u8]>>;
    fn revoke(&self, locator: &str) -> Result<(), ResourceError>;
}

struct StoredBlob {
    bytes: Arc<[u8]>,
    media_type: String,
}

/// In-memory provider handing out `blob:heicu/<uuid>` locators.
#[derive(Default)]
pub struct MemoryHandleProvider {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryHandleProvider {
    pub const SCHEME: &'static str = "blob:heicu/";

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of locators currently resolvable.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn media_type(&self, locator: &str) -> Option<String> {
        self.read().get(locator).map(|b| b.media_type.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StoredBlob>> {
        match self.blobs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Handle provider lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StoredBlob>> {
        match self.blobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Handle provider lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl HandleProvider for MemoryHandleProvider {
    fn allocate(&self, bytes: Arc<[u8]>, media_type: &str) -> Result<String, ResourceError> {
        let locator = format!("{}{}", Self::SCHEME, uuid::Uuid::new_v4());
        self.write().insert(
            locator.clone(),
            StoredBlob {
                bytes,
                media_type: media_type.to_string(),
            },
        );
        Ok(locator)
    }

    fn resolve(&self, locator: &str) -> Option<Arc<[u8]>> {
        self.read().get(locator).map(|b| Arc::clone(&b.bytes))
    }

    fn revoke(&self, locator: &str) -> Result<(), ResourceError> {
        match self.write().remove(locator) {
            Some(_) => Ok(()),
            None => Err(ResourceError::UnknownHandle(locator.to_string())),
        }
    }
}
