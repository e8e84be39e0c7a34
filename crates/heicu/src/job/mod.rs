//! Conversion jobs and the data they carry through their lifecycle.

mod input;
mod view;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use input::InputFile;
pub use view::{JobState, JobView};

use crate::resource::OutputHandle;
use crate::settings::OutputKind;

/// Message recorded on every failed job. The underlying cause is logged.
pub const CONVERSION_FAILED_MESSAGE: &str = "Failed to convert image";

/// Opaque job identifier: `<name>-<unix millis>-<random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate(name: &str) -> Self {
        Self(format!(
            "{}-{}-{}",
            name,
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Successful conversion result owned by a job.
#[derive(Debug)]
pub struct ConvertedOutput {
    handle: OutputHandle,
    filename: String,
}

impl ConvertedOutput {
    pub fn new(original_name: &str, handle: OutputHandle) -> Self {
        let filename = derive_output_filename(original_name, handle.kind());
        Self { handle, filename }
    }

    pub fn handle(&self) -> &OutputHandle {
        &self.handle
    }

    pub fn kind(&self) -> OutputKind {
        self.handle.kind()
    }

    /// Filename the output is saved under.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn into_handle(self) -> OutputHandle {
        self.handle
    }
}

/// Status of a job. Output and error are carried by the variant, so a job
/// can never hold both.
#[derive(Debug)]
pub enum JobStatus {
    Pending,
    Succeeded(ConvertedOutput),
    Failed { error: String },
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        match self {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Succeeded(_) => JobState::Succeeded,
            JobStatus::Failed { .. } => JobState::Failed,
        }
    }
}

/// A state transition applied by the orchestrator. There is no way back to pending.
#[derive(Debug)]
pub enum JobTransition {
    Succeed(OutputHandle),
    Fail(String),
}

#[derive(Debug)]
pub struct Job {
    id: JobId,
    original: InputFile,
    status: JobStatus,
    submitted_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a pending job with a fresh id.
    pub fn new(original: InputFile) -> Self {
        Self {
            id: JobId::generate(original.name()),
            original,
            status: JobStatus::Pending,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_id(id: JobId, original: InputFile) -> Self {
        Self {
            id,
            ..Self::new(original)
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn original_name(&self) -> &str {
        self.original.name()
    }

    pub fn original_file(&self) -> &InputFile {
        &self.original
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, JobStatus::Pending)
    }

    pub fn output(&self) -> Option<&ConvertedOutput> {
        match &self.status {
            JobStatus::Succeeded(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Replaces the status. Returns the previous status so the caller decides
    /// when a replaced output is released.
    pub fn apply(&mut self, transition: JobTransition) -> JobStatus {
        let next = match transition {
            JobTransition::Succeed(handle) => {
                JobStatus::Succeeded(ConvertedOutput::new(self.original.name(), handle))
            }
            JobTransition::Fail(error) => JobStatus::Failed { error },
        };
        self.finished_at = Some(Utc::now());
        std::mem::replace(&mut self.status, next)
    }

    /// Releases the output handle, if any, and keeps the original file for a re-run.
    pub fn discard(self) -> InputFile {
        if let JobStatus::Succeeded(output) = self.status {
            output.into_handle().revoke();
        }
        self.original
    }
}

/// Replaces the last extension of `original_name` with the one implied by
/// `kind`, appending it when there is none.
pub fn derive_output_filename(original_name: &str, kind: OutputKind) -> String {
    let stem = match original_name.rfind('.') {
        Some(idx) if idx > 0 => &original_name[..idx],
        _ => original_name,
    };
    format!("{}.{}", stem, kind.extension())
}
