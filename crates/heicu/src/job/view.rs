use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Job, JobId, JobStatus};
use crate::settings::OutputKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Succeeded,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "Converting..."),
            JobState::Succeeded => write!(f, "Converted"),
            JobState::Failed => write!(f, "Failed"),
        }
    }
}

/// Read-only snapshot of a job for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: JobId,
    pub original_name: String,
    pub state: JobState,
    /// Preview locator (succeeded only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    /// Download filename (succeeded only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_kind: Option<OutputKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<usize>,
    /// Error message (failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobView {
    pub fn is_downloadable(&self) -> bool {
        self.state == JobState::Succeeded && self.preview_url.is_some()
    }
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        let mut view = Self {
            id: job.id().clone(),
            original_name: job.original_name().to_string(),
            state: job.status().state(),
            preview_url: None,
            output_filename: None,
            output_kind: None,
            output_size: None,
            error: None,
            submitted_at: job.submitted_at(),
            finished_at: job.finished_at(),
        };

        match job.status() {
            JobStatus::Pending => {}
            JobStatus::Succeeded(output) => {
                view.preview_url = Some(output.handle().locator().to_string());
                view.output_filename = Some(output.filename().to_string());
                view.output_kind = Some(output.kind());
                view.output_size = Some(output.handle().len());
            }
            JobStatus::Failed { error } => {
                view.error = Some(error.clone());
            }
        }

        view
    }
}
