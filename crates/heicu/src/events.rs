//! Session event broadcaster: per-job progress and transient notices.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::JobId;
use crate::settings::OutputKind;

pub const NO_ELIGIBLE_FILES_NOTICE: &str = "No HEIC/HEIF files found. Please upload HEIC images.";
pub const NOTHING_TO_DOWNLOAD_NOTICE: &str = "No converted images to download";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventKind {
    JobQueued {
        job_id: JobId,
        filename: String,
    },
    JobStarted {
        job_id: JobId,
        filename: String,
        output_kind: OutputKind,
        quality: f32,
    },
    JobSucceeded {
        job_id: JobId,
        output_filename: String,
        size: usize,
    },
    JobFailed {
        job_id: JobId,
        error: String,
    },
    JobRemoved {
        job_id: JobId,
    },
    Cleared {
        count: usize,
    },
    /// Non-fatal advisory for the user.
    Notice {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match &self.kind {
            EventKind::JobQueued { job_id, .. }
            | EventKind::JobStarted { job_id, .. }
            | EventKind::JobSucceeded { job_id, .. }
            | EventKind::JobFailed { job_id, .. }
            | EventKind::JobRemoved { job_id } => Some(job_id),
            EventKind::Cleared { .. } | EventKind::Notice { .. } => None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Notice { message } => Some(message),
            _ => None,
        }
    }
}

/// Broadcasts session events to any number of subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<SessionEvent>>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, kind: EventKind) {
        // No active receivers is fine
        let _ = self.sender.send(SessionEvent::new(kind));
    }

    pub fn notify(&self, message: &str) {
        log::info!("{}", message);
        self.send(EventKind::Notice {
            message: message.to_string(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
