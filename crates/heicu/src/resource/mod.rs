//! Lifecycle of the transient handles that reference converted output.
//!
//! Every handle is wrapped in an [`OutputHandle`] guard, so each destruction
//! path of the owning job (removal, clear, reconvert, replacement, a result
//! arriving for a job that is already gone) releases it exactly once.

mod handle;
mod provider;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use handle::OutputHandle;
pub use provider::{HandleProvider, MemoryHandleProvider};

use crate::error::ResourceError;
use crate::settings::OutputKind;

/// Allocation bookkeeping shared between the manager and its handles.
#[derive(Debug, Default)]
pub struct ResourceCounters {
    allocated: AtomicU64,
    revoked: AtomicU64,
}

impl ResourceCounters {
    fn record_allocate(&self) {
        self.allocated.fetch_add(1, Ordering::SeqCst);
    }

    fn record_revoke(&self) {
        self.revoked.fetch_add(1, Ordering::SeqCst);
    }
}

/// Point-in-time view of handle bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStats {
    pub allocated: u64,
    pub revoked: u64,
}

impl ResourceStats {
    pub fn live(&self) -> u64 {
        self.allocated.saturating_sub(self.revoked)
    }
}

#[derive(Clone)]
pub struct ResourceManager {
    provider: Arc<dyn HandleProvider>,
    counters: Arc<ResourceCounters>,
}

impl ResourceManager {
    pub fn new(provider: Arc<dyn HandleProvider>) -> Self {
        Self {
            provider,
            counters: Arc::new(ResourceCounters::default()),
        }
    }

    /// Manager backed by a fresh [`MemoryHandleProvider`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHandleProvider::new()))
    }

    pub fn allocate(&self, bytes: Vec<u8>, kind: OutputKind) -> Result<OutputHandle, ResourceError> {
        if bytes.is_empty() {
            return Err(ResourceError::EmptyOutput);
        }

        let len = bytes.len();
        let locator = self
            .provider
            .allocate(Arc::from(bytes), kind.media_type())?;
        self.counters.record_allocate();
        log::debug!("Allocated output handle {} ({} bytes)", locator, len);

        Ok(OutputHandle::new(
            locator,
            kind,
            len,
            Arc::clone(&self.provider),
            Arc::clone(&self.counters),
        ))
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            allocated: self.counters.allocated.load(Ordering::SeqCst),
            revoked: self.counters.revoked.load(Ordering::SeqCst),
        }
    }

    pub fn provider(&self) -> Arc<dyn HandleProvider> {
        Arc::clone(&self.provider)
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::in_memory()
    }
}
