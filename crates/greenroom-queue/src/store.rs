//! In-memory job store.
//!
//! One lock guards the whole map. Readers get copies; writers hand in a
//! mutation that runs under the lock. Nothing awaits while the lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use greenroom_models::{Job, JobId};
use tokio::sync::RwLock;

use crate::error::{QueueError, QueueResult};

/// Cheaply clonable handle to the shared job registry.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job.
    pub async fn create(&self, job: Job) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(QueueError::JobExists(job.id.to_string()));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> QueueResult<Job> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::job_not_found(id))
    }

    /// Apply `mutation` to a job under the lock.
    pub async fn update<F, R>(&self, id: &JobId, mutation: F) -> QueueResult<R>
    where
        F: FnOnce(&mut Job) -> R,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or_else(|| QueueError::job_not_found(id))?;
        Ok(mutation(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenroom_models::{CompositionSettings, JobStatus, MediaProperties, RenderMode};

    fn job() -> Job {
        Job::new(MediaProperties::new(1280, 720, 10.0), None)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = JobStore::new();
        let job = job();
        let id = job.id.clone();

        store.create(job.clone()).await.unwrap();
        assert!(matches!(store.create(job).await, Err(QueueError::JobExists(_))));

        let snapshot = store.get(&id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Uploaded);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new();
        let id = JobId::from("missing");
        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store.update(&id, |j| j.fail("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_snapshots_are_copies() {
        let store = JobStore::new();
        let job = job();
        let id = job.id.clone();
        store.create(job).await.unwrap();

        let mut copy = store.get(&id).await.unwrap();
        copy.set_progress(50.0);
        assert_eq!(store.get(&id).await.unwrap().progress, 0.0);

        let status = store
            .update(&id, |j| {
                j.enqueue(CompositionSettings::default(), RenderMode::Export);
                j.status
            })
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Queued);
        assert_eq!(store.get(&id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = JobStore::new();
        let other = store.clone();
        let job = job();
        let id = job.id.clone();
        store.create(job).await.unwrap();

        other.update(&id, |j| j.set_progress(12.5)).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().progress, 12.5);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let store = JobStore::new();
        let job = job();
        let id = job.id.clone();
        store.create(job).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.update(&id, |j| j.set_progress(j.progress + 1.0)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get(&id).await.unwrap().progress, 50.0);
    }
}
