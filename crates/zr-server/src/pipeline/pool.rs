//! Bounded worker pool for encoding jobs.
//!
//! At most `jobs.max_concurrent` encoders run at once (a semaphore), and at
//! most `jobs.max_queued` more wait for a slot. Anything beyond that is
//! turned away with [`Error::Busy`] before a task is spawned.
//!
//! Each job runs on its own tokio task and reports back through a oneshot
//! channel, so a caller that goes away does not stop the encoder or skip
//! cleanup of the staged input. Submission itself never suspends: the staged
//! input is either owned by a spawned task or removed before `submit` returns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Semaphore};
use zr_core::config::JobsConfig;
use zr_core::{Error, GeneratedAsset, JobId, Result};

use super::assets::PendingInput;
use super::job::{EncodingJob, JobRuntime};

/// Message returned when the pool is saturated.
pub const SERVER_BUSY: &str = "Server busy, try again later";

pub struct JobPool {
    runtime: Arc<JobRuntime>,
    slots: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
    keep_staged_inputs: bool,
}

/// Receives the single completion of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    rx: oneshot::Receiver<Result<GeneratedAsset>>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<GeneratedAsset> {
        self.rx
            .await
            .map_err(|_| Error::Internal(format!("job {} ended without a result", self.id)))?
    }
}

/// Decrements the pending counter however the task exits.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl JobPool {
    pub fn new(runtime: JobRuntime, jobs: &JobsConfig, keep_staged_inputs: bool) -> Self {
        let workers = jobs.max_concurrent.max(1);
        Self {
            runtime: Arc::new(runtime),
            slots: Arc::new(Semaphore::new(workers)),
            pending: Arc::new(AtomicUsize::new(0)),
            capacity: workers + jobs.max_queued,
            keep_staged_inputs,
        }
    }

    /// Jobs currently running or waiting for a slot.
    pub fn in_flight(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether a new job would currently be admitted.
    ///
    /// Advisory only; [`JobPool::submit`] makes the binding decision.
    pub fn has_capacity(&self) -> bool {
        self.in_flight() < self.capacity
    }

    /// Admit a job for `input`, or reject it when the pool is full.
    ///
    /// A rejected job's staged input is removed before this returns.
    pub fn submit(&self, input: PendingInput) -> Result<JobHandle> {
        let admitted = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok();

        if !admitted {
            tracing::warn!(
                capacity = self.capacity,
                asset_id = %input.staged().id,
                "Worker pool full; rejecting job"
            );
            return Err(Error::Busy(SERVER_BUSY.into()));
        }

        let guard = PendingGuard(self.pending.clone());
        let mut job = EncodingJob::new(input.into_staged());
        let id = job.id();
        let (tx, rx) = oneshot::channel();

        let runtime = self.runtime.clone();
        let slots = self.slots.clone();
        let keep_staged = self.keep_staged_inputs;

        tracing::info!(job_id = %id, asset_id = %job.staged().id, "Job queued");

        tokio::spawn(async move {
            let result = match slots.acquire_owned().await {
                Ok(_permit) => job.run(&runtime).await,
                Err(_) => Err(Error::Internal("worker pool closed".into())),
            };

            if !keep_staged {
                runtime.store.discard(&job.staged().local_path).await;
            }

            match result {
                Ok(ref asset) => tracing::info!(job_id = %id, url = %asset.public_url, "Job succeeded"),
                Err(ref e) => tracing::warn!(job_id = %id, error = %e, "Job failed"),
            }

            drop(guard);
            if tx.send(result).is_err() {
                tracing::debug!(job_id = %id, "Requester went away before completion");
            }
        });

        Ok(JobHandle { id, rx })
    }

    /// Kill running encoders and stop admitting queued ones.
    pub fn shutdown(&self) {
        self.slots.close();
        self.runtime.shutdown.cancel();
    }
}
