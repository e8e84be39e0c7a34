use std::fmt;
use std::sync::Arc;

use super::{ResourceCounters, HandleProvider};
use crate::settings::OutputKind;

/// Exclusively owned handle to one converted output.
///
/// The handle is revoked exactly once: by [`OutputHandle::revoke`] or, when
/// the owner is discarded on any other path, by `Drop`. It is deliberately
/// not `Clone`; observers get the locator string instead.
pub struct OutputHandle {
    locator: String,
    kind: OutputKind,
    len: usize,
    provider: Arc<dyn HandleProvider>,
    counters: Arc<ResourceCounters>,
}

impl OutputHandle {
    pub(super) fn new(
        locator: String,
        kind: OutputKind,
        len: usize,
        provider: Arc<dyn HandleProvider>,
        counters: Arc<ResourceCounters>,
    ) -> Self {
        Self {
            locator,
            kind,
            len,
            provider,
            counters,
        }
    }

    /// Locator usable for preview rendering.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The output bytes, for saving under a derived filename.
    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.provider.resolve(&self.locator)
    }

    /// Releases the handle now.
    pub fn revoke(self) {
        drop(self);
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        match self.provider.revoke(&self.locator) {
            Ok(()) => {
                self.counters.record_revoke();
                log::debug!("Revoked output handle {}", self.locator);
            }
            Err(e) => {
                log::error!("Failed to revoke output handle {}: {}", self.locator, e);
            }
        }
    }
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle")
            .field("locator", &self.locator)
            .field("kind", &self.kind)
            .field("len", &self.len)
            .finish()
    }
}
