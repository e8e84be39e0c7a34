use tokio::task::JoinHandle;

use crate::job::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    /// The job left the registry before its result arrived.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub dropped: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[JobOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, outcome| {
            match outcome {
                JobOutcome::Succeeded => acc.succeeded += 1,
                JobOutcome::Failed => acc.failed += 1,
                JobOutcome::Dropped => acc.dropped += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.dropped
    }
}

/// A running batch. Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct BatchHandle {
    job_ids: Vec<JobId>,
    task: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    pub(super) fn new(job_ids: Vec<JobId>, task: JoinHandle<BatchSummary>) -> Self {
        Self { job_ids, task }
    }

    /// Ids of the jobs in this batch, in submission order.
    pub fn job_ids(&self) -> &[JobId] {
        &self.job_ids
    }

    /// Waits for every job in the batch to settle.
    pub async fn wait(self) -> BatchSummary {
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Batch task did not complete: {}", e);
                BatchSummary::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_outcomes() {
        let summary = BatchSummary::from_outcomes(&[
            JobOutcome::Succeeded,
            JobOutcome::Failed,
            JobOutcome::Succeeded,
            JobOutcome::Dropped,
        ]);
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 2,
                failed: 1,
                dropped: 1
            }
        );
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_outcomes(&[]).total(), 0);
    }
}
