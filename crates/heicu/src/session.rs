//! The user-facing conversion session.
//!
//! A session owns the job registry, the resource manager, the shared settings
//! and the event channel. Every user action (dropping files, removing a job,
//! clearing, re-running, downloading) is one method here. Batch conversions
//! run on spawned tokio tasks, so [`ConversionSession::submit`] and
//! [`ConversionSession::reconvert_all`] must be called from within a runtime.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::decoder::Decoder;
use crate::download::{DownloadReport, DownloadSink};
use crate::error::{DownloadError, SessionError, SettingsError};
use crate::events::{
    EventBroadcaster, EventKind, SessionEvent, NOTHING_TO_DOWNLOAD_NOTICE,
    NO_ELIGIBLE_FILES_NOTICE,
};
use crate::ingest;
use crate::job::{InputFile, JobId, JobView};
use crate::orchestrator::{BatchHandle, Orchestrator, QueuedJob};
use crate::registry::JobRegistry;
use crate::resource::{ResourceManager, ResourceStats};
use crate::settings::{ConversionSettings, OutputKind, Quality, SharedSettings};

#[derive(Clone)]
pub struct ConversionSession {
    registry: Arc<JobRegistry>,
    resources: ResourceManager,
    settings: SharedSettings,
    events: EventBroadcaster,
    orchestrator: Orchestrator,
}

impl ConversionSession {
    /// Session with default settings, sequential decoding and in-memory handles.
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self::build(
            decoder,
            ResourceManager::in_memory(),
            ConversionSettings::default(),
            1,
            EventBroadcaster::default(),
        )
    }

    pub fn with_resources(decoder: Arc<dyn Decoder>, resources: ResourceManager) -> Self {
        Self::build(
            decoder,
            resources,
            ConversionSettings::default(),
            1,
            EventBroadcaster::default(),
        )
    }

    pub fn from_config(
        config: &Config,
        decoder: Arc<dyn Decoder>,
        resources: ResourceManager,
    ) -> Result<Self, SettingsError> {
        Ok(Self::build(
            decoder,
            resources,
            config.conversion_settings()?,
            config.max_concurrent_decodes,
            EventBroadcaster::new(config.event_capacity),
        ))
    }

    fn build(
        decoder: Arc<dyn Decoder>,
        resources: ResourceManager,
        initial: ConversionSettings,
        max_concurrent_decodes: usize,
        events: EventBroadcaster,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let settings = SharedSettings::new(initial);
        let orchestrator = Orchestrator::new(
            Arc::clone(&registry),
            resources.clone(),
            settings.clone(),
            events.clone(),
            decoder,
        )
        .with_max_concurrent_decodes(max_concurrent_decodes);

        Self {
            registry,
            resources,
            settings,
            events,
            orchestrator,
        }
    }

    /// Admits the eligible files as pending jobs and starts converting them.
    ///
    /// When nothing is eligible a single notice is sent, the registry is left
    /// untouched and `None` is returned.
    pub fn submit(&self, files: Vec<InputFile>) -> Option<BatchHandle> {
        let Some(jobs) = ingest::admit(files) else {
            self.events.notify(NO_ELIGIBLE_FILES_NOTICE);
            return None;
        };

        let queued: Vec<QueuedJob> = jobs
            .iter()
            .map(|job| QueuedJob {
                id: job.id().clone(),
                file: job.original_file().clone(),
            })
            .collect();

        let appended = self.registry.append(jobs);
        let queued: Vec<QueuedJob> = queued
            .into_iter()
            .filter(|q| appended.contains(&q.id))
            .collect();

        for job in &queued {
            self.events.send(EventKind::JobQueued {
                job_id: job.id.clone(),
                filename: job.file.name().to_string(),
            });
        }
        log::info!("Queued {} file(s) for conversion", queued.len());

        Some(self.orchestrator.dispatch(queued))
    }

    /// Removes one job and releases its output. Returns false for an unknown id.
    ///
    /// A job still being decoded can be removed; its result is dropped when it
    /// arrives.
    pub fn remove(&self, id: &JobId) -> bool {
        let Some(job) = self.registry.remove(id) else {
            log::debug!("Remove requested for unknown job {}", id);
            return false;
        };

        job.discard();
        self.events.send(EventKind::JobRemoved { job_id: id.clone() });
        true
    }

    /// Removes every job and releases every output. Returns the number of
    /// jobs removed. On an empty session this does nothing at all.
    pub fn clear_all(&self) -> usize {
        let jobs = self.registry.clear();
        if jobs.is_empty() {
            return 0;
        }

        let count = jobs.len();
        for job in jobs {
            job.discard();
        }
        log::info!("Cleared {} job(s)", count);
        self.events.send(EventKind::Cleared { count });
        count
    }

    /// Discards every job and converts the same original files again, in display
    /// order, as a new batch with fresh ids and the current settings.
    ///
    /// Refused while any conversion is still pending.
    pub fn reconvert_all(&self) -> Result<Option<BatchHandle>, SessionError> {
        let jobs = self
            .registry
            .clear_if_idle()
            .map_err(|pending| SessionError::ConversionsInFlight { pending })?;
        let originals: Vec<InputFile> = jobs.into_iter().map(|job| job.discard()).collect();
        log::info!("Reconverting {} file(s)", originals.len());

        Ok(self.submit(originals))
    }

    /// Saves one converted output through `sink` under its derived filename.
    pub fn download(&self, id: &JobId, sink: &dyn DownloadSink) -> Result<PathBuf, DownloadError> {
        let (filename, bytes) = self
            .registry
            .with_job(id, |job| {
                job.output().map(|output| {
                    (
                        output.filename().to_string(),
                        output
                            .handle()
                            .bytes()
                            .ok_or_else(|| output.handle().locator().to_string()),
                    )
                })
            })
            .flatten()
            .ok_or_else(|| DownloadError::NotConverted(id.to_string()))?;

        let bytes = bytes.map_err(DownloadError::Unavailable)?;
        sink.save(&filename, &bytes)
    }

    /// Saves every succeeded output, in display order.
    ///
    /// With nothing to download exactly one notice is sent and `sink` is never
    /// called. A failing save is reported and does not stop the others.
    pub fn download_all(&self, sink: &dyn DownloadSink) -> DownloadReport {
        let ids = self.registry.succeeded_ids();
        if ids.is_empty() {
            self.events.notify(NOTHING_TO_DOWNLOAD_NOTICE);
            return DownloadReport::default();
        }

        let mut report = DownloadReport::default();
        for id in ids {
            match self.download(&id, sink) {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    log::warn!("Download of job {} failed: {}", id, e);
                    report.errors.push(e.to_string());
                }
            }
        }
        report
    }

    pub fn snapshot(&self) -> Vec<JobView> {
        self.registry.snapshot()
    }

    pub fn get(&self, id: &JobId) -> Option<JobView> {
        self.registry.get(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// True while any job is still converting.
    pub fn has_pending(&self) -> bool {
        self.registry.pending_count() > 0
    }

    pub fn settings(&self) -> ConversionSettings {
        self.settings.current()
    }

    /// Applies to jobs that start after this call.
    pub fn set_output_kind(&self, kind: OutputKind) {
        self.settings.set_output_kind(kind);
    }

    /// Applies to jobs that start after this call.
    pub fn set_quality(&self, value: f32) -> Result<Quality, SettingsError> {
        self.settings.set_quality(value)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn resource_stats(&self) -> ResourceStats {
        self.resources.stats()
    }

    pub fn max_concurrent_decodes(&self) -> usize {
        self.orchestrator.max_concurrent_decodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::job::JobState;
    use async_trait::async_trait;

    struct CopyDecoder;

    #[async_trait]
    impl Decoder for CopyDecoder {
        async fn decode(
            &self,
            input: &[u8],
            _kind: OutputKind,
            _quality: Quality,
        ) -> Result<Vec<u8>, DecodeError> {
            Ok(input.to_vec())
        }
    }

    fn session() -> ConversionSession {
        ConversionSession::new(Arc::new(CopyDecoder))
    }

    fn heic(name: &str) -> InputFile {
        InputFile::new(name, "", b"heic-bytes".to_vec())
    }

    #[tokio::test]
    async fn test_submit_converts_batch() {
        let session = session();
        let handle = session.submit(vec![heic("a.heic"), heic("b.HEIF")]).unwrap();

        let summary = handle.wait().await;

        assert_eq!(summary.succeeded, 2);
        assert!(!session.has_pending());
        assert!(session.snapshot().iter().all(|v| v.state == JobState::Succeeded));
    }

    #[tokio::test]
    async fn test_submit_ineligible_sends_one_notice() {
        let session = session();
        let mut events = session.subscribe();

        assert!(session.submit(vec![InputFile::new("doc.pdf", "application/pdf", vec![1])]).is_none());

        let event = events.try_recv().unwrap();
        assert_eq!(event.notice(), Some(NO_ELIGIBLE_FILES_NOTICE));
        assert!(events.try_recv().is_err());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_job() {
        let session = session();
        assert!(!session.remove(&JobId::from("nope")));
    }

    #[tokio::test]
    async fn test_clear_all_on_empty_session_is_silent() {
        let session = session();
        let mut events = session.subscribe();

        assert_eq!(session.clear_all(), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_all_releases_outputs() {
        let session = session();
        session.submit(vec![heic("a.heic"), heic("b.heic")]).unwrap().wait().await;

        assert_eq!(session.clear_all(), 2);

        assert!(session.is_empty());
        assert_eq!(session.resource_stats().live(), 0);
        assert_eq!(session.resource_stats().revoked, 2);
    }

    #[tokio::test]
    async fn test_reconvert_on_empty_session_sends_notice() {
        let session = session();
        let mut events = session.subscribe();

        assert!(session.reconvert_all().unwrap().is_none());
        assert_eq!(events.try_recv().unwrap().notice(), Some(NO_ELIGIBLE_FILES_NOTICE));
    }

    #[tokio::test]
    async fn test_download_unconverted_job() {
        struct NeverSink;
        impl DownloadSink for NeverSink {
            fn save(&self, _filename: &str, _bytes: &[u8]) -> Result<PathBuf, DownloadError> {
                panic!("sink must not be called");
            }
        }

        let session = session();
        let err = session.download(&JobId::from("missing"), &NeverSink).unwrap_err();
        assert!(matches!(err, DownloadError::NotConverted(_)));
    }

    #[tokio::test]
    async fn test_set_quality_validates() {
        let session = session();
        assert!(session.set_quality(0.3).is_ok());
        assert_eq!(session.settings().quality.percent(), 30);
        assert!(session.set_quality(0.0).is_err());
        assert_eq!(session.settings().quality.percent(), 30);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            output_kind: OutputKind::Png,
            max_concurrent_decodes: 3,
            ..Config::default()
        };
        let session =
            ConversionSession::from_config(&config, Arc::new(CopyDecoder), ResourceManager::default())
                .unwrap();
        assert_eq!(session.settings().output_kind, OutputKind::Png);
        assert_eq!(session.max_concurrent_decodes(), 3);
    }
}
