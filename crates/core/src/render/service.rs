//! Render service: admission, job records, and the pipeline sequence.
//!
//! ```text
//! submit -> slot -> record(running) -> wizard -> fetch -> transcode -> record(done)
//!                                                   \-> screenshot -> record(done, degraded)
//! ```
//!
//! Once the record exists the pipeline runs on its own task, which owns the
//! admission permit. A caller that goes away mid-job does not stop it: the
//! record still reaches a terminal status and the browser session is closed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::driver::{AssetUrls, Picker, SessionLauncher, WizardConfig, WizardSession, WizardStateMachine};
use crate::job::{Job, JobPatch, JobStore};
use crate::metrics;
use crate::retriever::{ArtifactRetriever, RetrieverConfig};
use crate::transcoder::{TranscodeJob, TranscodeSpec, Transcoder};

use super::config::StorageConfig;
use super::error::RenderError;
use super::slot::AdmissionSlot;
use super::types::{ArtifactOutcome, JobPaths, SubmitRequest};

/// Settings the render service needs from the application config.
#[derive(Debug, Clone, Default)]
pub struct RenderSettings {
    pub storage: StorageConfig,
    pub wizard: WizardConfig,
    pub retriever: RetrieverConfig,
    pub transcode: TranscodeSpec,
}

/// Single-flight render pipeline.
pub struct RenderService {
    pipeline: Pipeline,
    slot: AdmissionSlot,
}

/// Collaborators shared with the task running a job.
#[derive(Clone)]
struct Pipeline {
    launcher: Arc<dyn SessionLauncher>,
    retriever: Arc<dyn ArtifactRetriever>,
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn JobStore>,
    machine: Arc<WizardStateMachine>,
    settings: Arc<RenderSettings>,
}

impl RenderService {
    /// Create a new render service.
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        retriever: Arc<dyn ArtifactRetriever>,
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn JobStore>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                launcher,
                retriever,
                transcoder,
                store,
                machine: Arc::new(WizardStateMachine::new(settings.wizard.clone())),
                settings: Arc::new(settings),
            },
            slot: AdmissionSlot::new(),
        }
    }

    /// Replace how a result is picked from the grid.
    pub fn with_picker(mut self, picker: Picker) -> Self {
        let machine = WizardStateMachine::new(self.pipeline.settings.wizard.clone()).with_picker(picker);
        self.pipeline.machine = Arc::new(machine);
        self
    }

    /// Whether a job currently holds the admission slot.
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.pipeline.store
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.pipeline.settings
    }

    /// Runs one render job to completion.
    ///
    /// Fails with [`RenderError::Busy`] without touching the store when a
    /// job is already in flight. Dropping the returned future detaches the
    /// job rather than cancelling it; the slot stays taken until it ends.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Job, RenderError> {
        let Some(permit) = self.slot.try_acquire() else {
            metrics::BUSY_REJECTIONS.inc();
            warn!("Rejecting render submission: renderer busy");
            return Err(RenderError::Busy);
        };

        let started = Instant::now();
        let id = Uuid::new_v4().to_string();
        let settings = &self.pipeline.settings;
        let paths = JobPaths::new(
            &settings.storage,
            &id,
            &request.input_extension(),
            settings.transcode.output_format,
        );

        settings.storage.ensure_dirs().await?;
        tokio::fs::write(&paths.input, &request.image).await?;

        let job = Job::running(&id, &paths.input, request.demo_index);
        self.pipeline.store.create(&job)?;
        info!(job_id = %id, input = %paths.input.display(), "Render job admitted");

        if request.demo_index != 0 {
            info!(
                job_id = %id,
                demo_index = request.demo_index,
                "Variant hint recorded; the result is still picked at random"
            );
        }

        let pipeline = self.pipeline.clone();
        let job_id = id.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            pipeline.run_job(&job_id, &paths, started).await
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                let err = RenderError::Task(join_err.to_string());
                self.pipeline
                    .record_failure(&id, &err, started.elapsed().as_millis() as u64);
                Err(err)
            }
        }
    }
}

impl Pipeline {
    /// Runs the pipeline and moves the record to its terminal status.
    async fn run_job(&self, id: &str, paths: &JobPaths, started: Instant) -> Result<Job, RenderError> {
        let result = self.run_pipeline(id, paths).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (outcome, urls) = match result {
            Ok(done) => done,
            Err(err) => {
                self.record_failure(id, &err, duration_ms);
                return Err(err);
            }
        };

        let output_url = self.settings.storage.public_url(outcome.output_path());
        let patch = JobPatch::done(outcome.output_path(), output_url, duration_ms).with_video_url(urls.video);
        let job = match self.store.update(id, &patch) {
            Ok(job) => job,
            Err(store_err) => {
                let err = RenderError::Store(store_err);
                self.record_failure(id, &err, duration_ms);
                return Err(err);
            }
        };

        metrics::JOBS_TOTAL.with_label_values(&[outcome.label()]).inc();
        metrics::JOB_DURATION
            .with_label_values(&[outcome.label()])
            .observe(duration_ms as f64 / 1000.0);

        info!(
            job_id = %id,
            output = %outcome.output_path().display(),
            degraded = outcome.is_degraded(),
            duration_ms,
            "Render job done"
        );
        Ok(job)
    }

    /// Counts the failure and writes the error patch. Best effort.
    fn record_failure(&self, id: &str, err: &RenderError, duration_ms: u64) {
        metrics::JOBS_TOTAL.with_label_values(&["error"]).inc();
        metrics::JOB_DURATION
            .with_label_values(&["error"])
            .observe(duration_ms as f64 / 1000.0);

        error!(job_id = %id, kind = err.kind(), "Render job failed: {}", err);
        if let Err(store_err) = self.store.update(id, &JobPatch::failed(err.to_string(), duration_ms)) {
            warn!(job_id = %id, "Failed to record job failure: {}", store_err);
        }
    }

    /// Owns the browser session for the whole job and always closes it.
    async fn run_pipeline(
        &self,
        id: &str,
        paths: &JobPaths,
    ) -> Result<(ArtifactOutcome, AssetUrls), RenderError> {
        let mut session = self.launcher.launch().await.inspect_err(|e| {
            metrics::DRIVER_FAILURES.with_label_values(&[e.kind()]).inc();
        })?;

        let result = self.drive_session(session.as_mut(), id, paths).await;

        if let Err(e) = session.close().await {
            warn!(job_id = %id, "Failed to close browser session: {}", e);
        }
        result
    }

    async fn drive_session(
        &self,
        session: &mut dyn WizardSession,
        id: &str,
        paths: &JobPaths,
    ) -> Result<(ArtifactOutcome, AssetUrls), RenderError> {
        let wizard = self.machine.run(session, &paths.input).await.inspect_err(|e| {
            metrics::DRIVER_FAILURES.with_label_values(&[e.kind()]).inc();
        })?;

        let urls = wizard.reference.urls(&self.settings.retriever.asset_base_url);
        info!(job_id = %id, video_url = %urls.video, still_url = %urls.still, "Composed asset URLs");

        let render_wait = Duration::from_millis(self.settings.retriever.render_wait_ms);
        if !render_wait.is_zero() {
            debug!(job_id = %id, "Giving the remote renderer {:?}", render_wait);
            tokio::time::sleep(render_wait).await;
        }

        let outcome = match self.retriever.fetch(&urls.video).await {
            Ok(video) => self.transcode(id, paths, video).await?,
            Err(e) => {
                metrics::DOWNLOAD_FAILURES.inc();
                warn!(job_id = %id, "Video download failed, capturing a screenshot instead: {}", e);

                let scope = session.capture_screenshot(&paths.degraded).await?;
                info!(
                    job_id = %id,
                    scope = scope.as_str(),
                    path = %paths.degraded.display(),
                    "Saved fallback screenshot"
                );
                ArtifactOutcome::Degraded {
                    screenshot_path: paths.degraded.clone(),
                    scope,
                    reason: e.to_string(),
                }
            }
        };

        Ok((outcome, urls))
    }

    async fn transcode(&self, id: &str, paths: &JobPaths, video: Bytes) -> Result<ArtifactOutcome, RenderError> {
        tokio::fs::write(&paths.download, &video).await?;
        debug!(job_id = %id, bytes = video.len(), path = %paths.download.display(), "Saved downloaded video");

        let spec = self.settings.transcode.clone();
        let format = spec.output_format.extension();
        let started = Instant::now();

        let result = self
            .transcoder
            .transcode(TranscodeJob {
                job_id: id.to_string(),
                input_path: paths.download.clone(),
                output_path: paths.output.clone(),
                spec,
            })
            .await;

        match result {
            Ok(result) => {
                metrics::TRANSCODE_DURATION
                    .with_label_values(&[format, "success"])
                    .observe(result.duration_ms as f64 / 1000.0);

                if let Err(e) = tokio::fs::remove_file(&paths.download).await {
                    warn!(job_id = %id, "Failed to remove {}: {}", paths.download.display(), e);
                }
                Ok(ArtifactOutcome::Transcoded {
                    output_path: result.output_path,
                })
            }
            Err(e) => {
                metrics::TRANSCODE_DURATION
                    .with_label_values(&[format, "failure"])
                    .observe(started.elapsed().as_secs_f64());

                warn!(
                    job_id = %id,
                    kept = %paths.download.display(),
                    "Transcode failed, downloaded video kept for inspection"
                );
                Err(e.into())
            }
        }
    }
}
