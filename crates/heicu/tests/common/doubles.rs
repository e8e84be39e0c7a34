//! Test doubles for the decoder, handle provider and download sink seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use heicu::decoder::Decoder;
use heicu::download::DownloadSink;
use heicu::error::{DecodeError, DownloadError, ResourceError};
use heicu::resource::{HandleProvider, MemoryHandleProvider};
use heicu::settings::{OutputKind, Quality};

/// One recorded call to [`ScriptedDecoder::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeCall {
    pub input: String,
    pub kind: OutputKind,
    pub quality: Quality,
}

struct Gate {
    entered: Arc<Notify>,
    release: oneshot::Receiver<()>,
}

/// Lets a test hold one decode call open until it decides to release it.
pub struct GateControl {
    entered: Arc<Notify>,
    release: Option<oneshot::Sender<()>>,
}

impl GateControl {
    /// Resolves once the gated decode call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(());
        }
    }
}

/// Decoder whose behavior is chosen by the input bytes.
///
/// - bytes containing `fail` return a decode error
/// - bytes containing `panic` panic inside the decoder
/// - anything else succeeds with `<ext>:<input>`
#[derive(Default)]
pub struct ScriptedDecoder {
    calls: Mutex<Vec<DecodeCall>>,
    log: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Gate>>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the next decode of `input` open until the returned control is released.
    pub fn hold(&self, input: &str) -> GateControl {
        let entered = Arc::new(Notify::new());
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(
            input.to_string(),
            Gate {
                entered: Arc::clone(&entered),
                release: rx,
            },
        );
        GateControl {
            entered,
            release: Some(tx),
        }
    }

    pub fn calls(&self) -> Vec<DecodeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// `start:<input>` / `end:<input>` entries in the order they happened.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Decoder for ScriptedDecoder {
    async fn decode(
        &self,
        input: &[u8],
        kind: OutputKind,
        quality: Quality,
    ) -> Result<Vec<u8>, DecodeError> {
        let body = String::from_utf8_lossy(input).to_string();
        self.log.lock().unwrap().push(format!("start:{}", body));
        self.calls.lock().unwrap().push(DecodeCall {
            input: body.clone(),
            kind,
            quality,
        });

        let gate = self.gates.lock().unwrap().remove(&body);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            let _ = gate.release.await;
        }

        if body.contains("panic") {
            panic!("decoder crashed on {}", body);
        }

        let result = if body.contains("fail") {
            Err(DecodeError::Failed(format!("cannot decode {}", body)))
        } else {
            Ok(format!("{}:{}", kind.extension(), body).into_bytes())
        };

        self.log.lock().unwrap().push(format!("end:{}", body));
        result
    }
}

type RevokeObserver = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Handle provider recording every allocation and every revoke attempt.
#[derive(Default)]
pub struct RecordingProvider {
    inner: MemoryHandleProvider,
    allocated: Mutex<Vec<String>>,
    revocations: Mutex<HashMap<String, usize>>,
    revoked_while_listed: Mutex<Vec<String>>,
    observer: Mutex<Option<RevokeObserver>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a check run on every revoke; returning true marks the locator
    /// as revoked while still shown.
    pub fn set_observer(&self, observer: impl Fn(&str) -> bool + Send + Sync + 'static) {
        *self.observer.lock().unwrap() = Some(Box::new(observer));
    }

    pub fn allocated(&self) -> Vec<String> {
        self.allocated.lock().unwrap().clone()
    }

    pub fn revoke_count(&self, locator: &str) -> usize {
        self.revocations
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_revokes(&self) -> usize {
        self.revocations.lock().unwrap().values().sum()
    }

    /// True when every locator handed out so far was revoked exactly once.
    pub fn all_revoked_once(&self) -> bool {
        self.allocated()
            .iter()
            .all(|locator| self.revoke_count(locator) == 1)
    }

    pub fn revoked_while_listed(&self) -> Vec<String> {
        self.revoked_while_listed.lock().unwrap().clone()
    }

    pub fn live(&self) -> usize {
        self.inner.len()
    }
}

impl HandleProvider for RecordingProvider {
    fn allocate(&self, bytes: Arc<[u8]>, media_type: &str) -> Result<String, ResourceError> {
        let locator = self.inner.allocate(bytes, media_type)?;
        self.allocated.lock().unwrap().push(locator.clone());
        Ok(locator)
    }

    fn resolve(&self, locator: &str) -> Option<Arc<[u8]>> {
        self.inner.resolve(locator)
    }

    fn revoke(&self, locator: &str) -> Result<(), ResourceError> {
        *self
            .revocations
            .lock()
            .unwrap()
            .entry(locator.to_string())
            .or_insert(0) += 1;

        if let Some(observer) = self.observer.lock().unwrap().as_ref() {
            if observer(locator) {
                self.revoked_while_listed
                    .lock()
                    .unwrap()
                    .push(locator.to_string());
            }
        }

        self.inner.revoke(locator)
    }
}

/// Download sink keeping saved files in memory.
#[derive(Default)]
pub struct RecordingSink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    fail_on: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that refuses to save `filename`.
    pub fn failing_on(filename: &str) -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail_on: Some(filename.to_string()),
        }
    }

    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.saved().into_iter().map(|(name, _)| name).collect()
    }
}

impl DownloadSink for RecordingSink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        if self.fail_on.as_deref() == Some(filename) {
            return Err(DownloadError::WriteFile {
                path: PathBuf::from(filename),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), bytes.to_vec()));
        Ok(PathBuf::from(filename))
    }
}
