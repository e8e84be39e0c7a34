//! Session wired to recording collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::broadcast;

use heicu::config::Config;
use heicu::events::{EventKind, SessionEvent};
use heicu::job::{InputFile, JobId, JobView};
use heicu::resource::ResourceManager;
use heicu::session::ConversionSession;

use super::doubles::{RecordingProvider, ScriptedDecoder};

pub struct TestHarness {
    pub session: ConversionSession,
    pub decoder: Arc<ScriptedDecoder>,
    pub provider: Arc<RecordingProvider>,
    events: broadcast::Receiver<SessionEvent>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Harness whose session runs up to `limit` decodes at once.
    pub fn with_concurrency(limit: usize) -> Self {
        Self::with_config(Config {
            max_concurrent_decodes: limit,
            ..Config::default()
        })
    }

    pub fn with_config(config: Config) -> Self {
        let decoder = Arc::new(ScriptedDecoder::new());
        let provider = Arc::new(RecordingProvider::new());
        let resources = ResourceManager::new(provider.clone());
        let session = ConversionSession::from_config(&config, decoder.clone(), resources)
            .expect("test config should be valid");

        // Reports any locator still shown as a preview at the moment it is revoked.
        let observed = session.clone();
        provider.set_observer(move |locator| {
            observed
                .snapshot()
                .iter()
                .any(|view| view.preview_url.as_deref() == Some(locator))
        });

        let events = session.subscribe();
        Self {
            session,
            decoder,
            provider,
            events,
        }
    }

    /// A HEIC file whose bytes script the decoder (see [`ScriptedDecoder`]).
    pub fn heic(name: &str, body: &str) -> InputFile {
        InputFile::new(name, "", body.as_bytes().to_vec())
    }

    /// Submits `files` and waits for the batch to settle.
    pub async fn convert(&self, files: Vec<InputFile>) -> Vec<JobId> {
        let batch = self
            .session
            .submit(files)
            .expect("batch should contain eligible files");
        let ids = batch.job_ids().to_vec();
        batch.wait().await;
        ids
    }

    pub fn views(&self) -> Vec<JobView> {
        self.session.snapshot()
    }

    /// Every event received since the last call.
    pub fn take_events(&mut self) -> Vec<EventKind> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event.kind);
        }
        events
    }

    pub fn notices(events: &[EventKind]) -> Vec<String> {
        events
            .iter()
            .filter_map(|kind| match kind {
                EventKind::Notice { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}
