//! Pipeline runner.

use std::sync::Arc;
use std::time::Instant;

use eduvid_models::{Job, JobId, StageName};
use tokio::sync::Semaphore;
use tracing::{error, info, Instrument};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::services::Services;
use crate::stages::{self, StageContext};
use crate::store::JobStore;

/// Runs jobs through the fixed stage list.
///
/// Stages of one job run strictly in order; separate jobs run as separate
/// tasks, at most `max_concurrent_jobs` at a time. A job waiting for a slot
/// stays `queued`.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    store: Arc<JobStore>,
    services: Services,
    config: Arc<PipelineConfig>,
    job_semaphore: Arc<Semaphore>,
}

impl PipelineRunner {
    pub fn new(store: Arc<JobStore>, services: Services, config: PipelineConfig) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            store,
            services,
            config: Arc::new(config),
            job_semaphore,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Store a queued job and start it in the background.
    pub async fn submit(&self, job: Job) -> JobId {
        let id = self.store.create(job).await;
        metrics::counter!("eduvid_jobs_created_total").increment(1);

        let runner = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let worker = runner.clone();
            let worker_id = task_id.clone();
            let outcome = tokio::spawn(async move { worker.execute(&worker_id).await }).await;
            let reason = match outcome {
                Ok(Ok(_)) => return,
                Ok(Err(e)) => format!("Pipeline run aborted: {e}"),
                Err(join_err) => format!("Pipeline task panicked: {join_err}"),
            };
            runner.abandon(&task_id, reason).await;
        });

        id
    }

    /// Fail a job whose task ended without leaving it terminal.
    async fn abandon(&self, id: &JobId, reason: String) {
        error!(job_id = %id, "{}", reason);
        let stuck = self
            .store
            .get(id)
            .await
            .is_some_and(|job| !job.is_terminal());
        if !stuck {
            return;
        }
        metrics::counter!("eduvid_jobs_failed_total").increment(1);
        if let Err(e) = self.store.fail(id, reason).await {
            error!(job_id = %id, "Could not mark job failed: {}", e);
        }
    }

    /// Run a stored job to a terminal status.
    ///
    /// Stage failures are recorded on the job and are not returned as
    /// errors; `Err` means the job could not be driven at all.
    pub async fn execute(&self, id: &JobId) -> PipelineResult<Job> {
        let _permit = self
            .job_semaphore
            .acquire()
            .await
            .map_err(|_| PipelineError::config_error("job semaphore closed"))?;

        let job = self.store.start(id).await?;
        let logger = JobLogger::new(id, &job.project_name);
        let span = logger.create_span();

        self.run_stages(job, &logger).instrument(span).await
    }

    async fn run_stages(&self, job: Job, logger: &JobLogger) -> PipelineResult<Job> {
        let id = job.id.clone();
        let started = Instant::now();
        logger.log_start(&job.description);

        let work_dir = self.config.job_dir(id.as_str());
        if let Err(e) = tokio::fs::create_dir_all(&work_dir).await {
            return self
                .fail_job(&id, logger, format!("Could not create output directory: {e}"))
                .await;
        }

        let mut snapshot = job;
        for stage in StageName::ALL {
            snapshot = self.store.begin_stage(&id, stage).await?;
            logger.log_stage_start(stage);
            let stage_started = Instant::now();

            let ctx = StageContext {
                job_id: &id,
                description: &snapshot.description,
                project_name: &snapshot.project_name,
                add_subtitles: snapshot.add_subtitles,
                work_dir: &work_dir,
                results: &snapshot.results,
                config: &self.config,
                services: &self.services,
            };
            let result = stages::run(stage, &ctx).await;

            let elapsed = stage_started.elapsed().as_secs_f64();
            metrics::histogram!("eduvid_stage_duration_seconds", "stage" => stage.as_str())
                .record(elapsed);

            match result {
                Ok(artifact) => {
                    logger.log_stage_done(stage, &artifact, elapsed);
                    snapshot = self.store.record_artifact(&id, stage, artifact).await?;
                }
                Err(e) => {
                    metrics::counter!("eduvid_stage_failures_total", "stage" => stage.as_str())
                        .increment(1);
                    let message = match e {
                        PipelineError::StageFailed { .. } => e.to_string(),
                        other => format!("{stage} failed: {other}"),
                    };
                    return self.fail_job(&id, logger, message).await;
                }
            }
        }

        let job = self.store.complete(&id).await?;

        metrics::counter!("eduvid_jobs_completed_total").increment(1);
        metrics::histogram!("eduvid_job_duration_seconds").record(started.elapsed().as_secs_f64());
        logger.log_completion(job.final_video().unwrap_or_default());
        info!(job_id = %id, "Video ready");

        Ok(job)
    }

    async fn fail_job(
        &self,
        id: &JobId,
        logger: &JobLogger,
        message: String,
    ) -> PipelineResult<Job> {
        logger.log_error(&message);
        metrics::counter!("eduvid_jobs_failed_total").increment(1);
        self.store.fail(id, message).await
    }
}
