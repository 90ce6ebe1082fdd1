//! Process-wide job store.
//!
//! Each job lives behind its own lock inside the map. The map lock is only
//! held for insert and lookup, so status polls on one job never wait on the
//! runner writing another. Callers only ever see cloned snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use eduvid_models::{Job, JobId, StageName, TransitionError};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<RwLock<Job>>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job and return its id.
    pub async fn create(&self, job: Job) -> JobId {
        let id = job.id.clone();
        self.jobs
            .write()
            .await
            .insert(id.clone(), Arc::new(RwLock::new(job)));
        id
    }

    async fn entry(&self, id: &JobId) -> PipelineResult<Arc<RwLock<Job>>> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::JobNotFound(id.to_string()))
    }

    /// Snapshot of one job.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        let entry = self.entry(id).await.ok()?;
        let job = entry.read().await.clone();
        Some(job)
    }

    /// Snapshots of all jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let entries: Vec<_> = self.jobs.read().await.values().cloned().collect();

        let mut jobs = Vec::with_capacity(entries.len());
        for entry in entries {
            jobs.push(entry.read().await.clone());
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Apply a guarded transition and return the resulting snapshot.
    async fn update<F>(&self, id: &JobId, f: F) -> PipelineResult<Job>
    where
        F: FnOnce(&mut Job) -> Result<(), TransitionError>,
    {
        let entry = self.entry(id).await?;
        let mut job = entry.write().await;
        if let Err(e) = f(&mut *job) {
            warn!(job_id = %id, status = %job.status, "Rejected job update: {}", e);
            return Err(e.into());
        }
        Ok(job.clone())
    }

    pub async fn start(&self, id: &JobId) -> PipelineResult<Job> {
        self.update(id, Job::start).await
    }

    pub async fn begin_stage(&self, id: &JobId, stage: StageName) -> PipelineResult<Job> {
        self.update(id, |job| job.begin_stage(stage)).await
    }

    pub async fn record_artifact(
        &self,
        id: &JobId,
        stage: StageName,
        artifact: impl Into<String>,
    ) -> PipelineResult<Job> {
        let artifact = artifact.into();
        self.update(id, move |job| job.record_artifact(stage, artifact))
            .await
    }

    pub async fn complete(&self, id: &JobId) -> PipelineResult<Job> {
        self.update(id, Job::complete).await
    }

    pub async fn fail(&self, id: &JobId, error: impl Into<String>) -> PipelineResult<Job> {
        let error = error.into();
        self.update(id, move |job| job.fail(error)).await
    }
}
