//! Drives pending jobs through the decoder and records the result.
//!
//! Each submitted batch is a queue drained by one task. With the default
//! limit of one decode at a time a job starts only after the previous job's
//! state update has been applied. Decode failures of any kind become a
//! `failed` job and never leave the batch.

mod batch;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use tracing::{debug, info, info_span, warn, Instrument};

pub use batch::{BatchHandle, BatchSummary, JobOutcome};

use crate::decoder::Decoder;
use crate::error::DecodeError;
use crate::events::{EventBroadcaster, EventKind};
use crate::job::{derive_output_filename, InputFile, JobId, JobTransition, CONVERSION_FAILED_MESSAGE};
use crate::registry::{JobRegistry, UpdateOutcome};
use crate::resource::ResourceManager;
use crate::settings::SharedSettings;

/// A job as handed to the orchestrator right after it was appended.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: JobId,
    pub file: InputFile,
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    resources: ResourceManager,
    settings: SharedSettings,
    events: EventBroadcaster,
    decoder: Arc<dyn Decoder>,
    max_concurrent_decodes: usize,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        resources: ResourceManager,
        settings: SharedSettings,
        events: EventBroadcaster,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        Self {
            registry,
            resources,
            settings,
            events,
            decoder,
            max_concurrent_decodes: 1,
        }
    }

    /// Allows up to `limit` decodes of one batch to run at once. Start order
    /// still follows submission order.
    pub fn with_max_concurrent_decodes(mut self, limit: usize) -> Self {
        self.max_concurrent_decodes = limit.max(1);
        self
    }

    pub fn max_concurrent_decodes(&self) -> usize {
        self.max_concurrent_decodes
    }

    /// Spawns a task converting `batch` and returns a handle to await it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, batch: Vec<QueuedJob>) -> BatchHandle {
        let job_ids: Vec<JobId> = batch.iter().map(|j| j.id.clone()).collect();
        let span = info_span!("batch", size = batch.len());
        let orchestrator = self.clone();

        let task = tokio::spawn(async move { orchestrator.run_batch(batch).await }.instrument(span));

        BatchHandle::new(job_ids, task)
    }

    /// Converts every job of `batch`, honoring the concurrency limit.
    pub async fn run_batch(&self, batch: Vec<QueuedJob>) -> BatchSummary {
        let outcomes: Vec<JobOutcome> = stream::iter(batch)
            .map(|job| self.process(job))
            .buffered(self.max_concurrent_decodes)
            .collect()
            .await;

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            dropped = summary.dropped,
            "Batch finished"
        );
        summary
    }

    async fn process(&self, job: QueuedJob) -> JobOutcome {
        let QueuedJob { id, file } = job;
        let span = info_span!("job", job_id = %id, filename = %file.name());

        async {
            // Read at dispatch time: a settings change affects jobs that have not started yet.
            let settings = self.settings.current();
            self.events.send(EventKind::JobStarted {
                job_id: id.clone(),
                filename: file.name().to_string(),
                output_kind: settings.output_kind,
                quality: settings.quality.value(),
            });
            debug!(kind = %settings.output_kind, quality = %settings.quality, "Decoding");

            let decoded = AssertUnwindSafe(self.decoder.decode(
                file.bytes(),
                settings.output_kind,
                settings.quality,
            ))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DecodeError::Panicked(panic_message(panic.as_ref()))));

            let handle = match decoded {
                Ok(bytes) => self
                    .resources
                    .allocate(bytes, settings.output_kind)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match handle {
                Ok(handle) => {
                    let size = handle.len();
                    let output_filename = derive_output_filename(file.name(), handle.kind());
                    match self.registry.update(&id, JobTransition::Succeed(handle)) {
                        UpdateOutcome::Applied => {
                            info!(size, "Converted");
                            self.events.send(EventKind::JobSucceeded {
                                job_id: id.clone(),
                                output_filename,
                                size,
                            });
                            JobOutcome::Succeeded
                        }
                        UpdateOutcome::Missing => {
                            debug!("Job removed during conversion, output released");
                            JobOutcome::Dropped
                        }
                    }
                }
                Err(cause) => {
                    warn!(error = %cause, "Conversion failed");
                    let transition = JobTransition::Fail(CONVERSION_FAILED_MESSAGE.to_string());
                    match self.registry.update(&id, transition) {
                        UpdateOutcome::Applied => {
                            self.events.send(EventKind::JobFailed {
                                job_id: id.clone(),
                                error: CONVERSION_FAILED_MESSAGE.to_string(),
                            });
                            JobOutcome::Failed
                        }
                        UpdateOutcome::Missing => JobOutcome::Dropped,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
