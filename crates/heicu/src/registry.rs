//! Authoritative, ordered store of conversion jobs.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::job::{InputFile, Job, JobId, JobStatus, JobTransition, JobView};

/// Result of [`JobRegistry::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// No job with that id. The transition (and any handle it carried) was dropped.
    Missing,
}

/// Ordered job collection keyed by id.
///
/// Insertion order is display order. Removal hands jobs back to the caller so
/// their handles are released after they leave the list.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<Vec<Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Job>> {
        match self.jobs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Job>> {
        match self.jobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Appends jobs at the end. Jobs whose id is already present are skipped.
    /// Returns the ids that were appended, in order.
    pub fn append(&self, jobs: Vec<Job>) -> Vec<JobId> {
        let mut guard = self.write();
        let mut known: HashSet<JobId> = guard.iter().map(|j| j.id().clone()).collect();
        let mut appended = Vec::with_capacity(jobs.len());

        for job in jobs {
            if !known.insert(job.id().clone()) {
                log::warn!("Job {} already registered, skipping duplicate", job.id());
                continue;
            }
            appended.push(job.id().clone());
            guard.push(job);
        }

        appended
    }

    /// Applies `transition` to the job with `id`.
    ///
    /// A missing id is not an error: the job was removed while its conversion
    /// was in flight. A replaced output is released once the lock is dropped.
    pub fn update(&self, id: &JobId, transition: JobTransition) -> UpdateOutcome {
        let previous = {
            let mut guard = self.write();
            match guard.iter().position(|j| j.id() == id) {
                Some(index) => guard[index].apply(transition),
                None => {
                    drop(guard);
                    log::debug!("Job {} no longer registered, dropping update", id);
                    // Releases the handle a success would have attached.
                    drop(transition);
                    return UpdateOutcome::Missing;
                }
            }
        };

        if let JobStatus::Succeeded(output) = previous {
            log::warn!("Job {} output replaced, releasing previous handle", id);
            output.into_handle().revoke();
        }

        UpdateOutcome::Applied
    }

    pub fn remove(&self, id: &JobId) -> Option<Job> {
        let mut guard = self.write();
        let index = guard.iter().position(|j| j.id() == id)?;
        Some(guard.remove(index))
    }

    /// Empties the registry, returning the jobs in display order.
    pub fn clear(&self) -> Vec<Job> {
        std::mem::take(&mut *self.write())
    }

    /// Empties the registry only if no job is pending, checked under the same
    /// lock. Otherwise the jobs stay and the pending count is returned.
    pub fn clear_if_idle(&self) -> Result<Vec<Job>, usize> {
        let mut guard = self.write();
        let pending = guard.iter().filter(|j| j.is_pending()).count();
        if pending > 0 {
            return Err(pending);
        }
        Ok(std::mem::take(&mut *guard))
    }

    pub fn snapshot(&self) -> Vec<JobView> {
        self.read().iter().map(JobView::from).collect()
    }

    pub fn get(&self, id: &JobId) -> Option<JobView> {
        self.read().iter().find(|j| j.id() == id).map(JobView::from)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.read().iter().any(|j| j.id() == id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.read().iter().filter(|j| j.is_pending()).count()
    }

    pub fn succeeded_ids(&self) -> Vec<JobId> {
        self.read()
            .iter()
            .filter(|j| j.output().is_some())
            .map(|j| j.id().clone())
            .collect()
    }

    /// Original files in display order.
    pub fn original_files(&self) -> Vec<InputFile> {
        self.read().iter().map(|j| j.original_file().clone()).collect()
    }

    /// Runs `f` against the job with `id` while holding the read lock.
    pub fn with_job<R>(&self, id: &JobId, f: impl FnOnce(&Job) -> R) -> Option<R> {
        self.read().iter().find(|j| j.id() == id).map(f)
    }
}
