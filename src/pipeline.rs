use chrono::Local;
use futures::StreamExt;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::driver::{JobDriver, JobHandle};
use crate::error::{JobError, PipelineError};
use crate::facts::ContentItem;
use crate::request::{GenerationRequest, RequestBuilder, Style};
use crate::rotator::ContentRotator;
use crate::timer::Timer;
use crate::upload::{
    UploadLog, UploadLogEntry, UploadMetadata, UploadReceipt, UploadResult, Uploader,
    artifact_local_path,
};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Pause between consecutive submissions.
    pub delay: Duration,
    pub storage_dir: PathBuf,
    pub daily_upload_limit: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            storage_dir: PathBuf::from("storage"),
            daily_upload_limit: crate::upload::DEFAULT_DAILY_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub handle: JobHandle,
    pub item: ContentItem,
    pub script: String,
    pub artifacts: Vec<String>,
    pub local_paths: Vec<PathBuf>,
    pub upload: UploadOutcome,
}

/// What happened to the rendered video after the job succeeded. An upload
/// failure never discards the render: the report still carries the paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    NotConfigured,
    Uploaded(UploadReceipt),
    LimitReached,
    Failed(String),
}

#[derive(Debug)]
pub struct BatchEntry {
    pub index: usize,
    pub result: Result<JobReport, PipelineError>,
}

struct UploadStage {
    uploader: Arc<dyn Uploader>,
    log: Mutex<UploadLog>,
}

/// Rotator + driver + optional uploader. The rotator sits behind a mutex so
/// concurrent jobs never draw the same fact within a cycle.
pub struct Pipeline {
    rotator: Mutex<ContentRotator>,
    driver: JobDriver,
    style: Style,
    rng: std::sync::Mutex<StdRng>,
    timer: Arc<dyn Timer>,
    settings: BatchSettings,
    upload: Option<UploadStage>,
    last_submit: Mutex<Option<Instant>>,
}

impl Pipeline {
    pub fn new(
        rotator: ContentRotator,
        driver: JobDriver,
        style: Style,
        rng: StdRng,
        timer: Arc<dyn Timer>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            rotator: Mutex::new(rotator),
            driver,
            style,
            rng: std::sync::Mutex::new(rng),
            timer,
            settings,
            upload: None,
            last_submit: Mutex::new(None),
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>, log: UploadLog) -> Self {
        self.upload = Some(UploadStage {
            uploader,
            log: Mutex::new(log),
        });
        self
    }

    async fn prepare(&self) -> Result<(ContentItem, GenerationRequest), PipelineError> {
        let item = self.rotator.lock().await.next()?;
        let request = {
            let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
            RequestBuilder::new(&self.style).for_item(&item, &mut *rng)
        };
        info!(
            "Fact {} [{} / {}]: {}",
            item.id, item.category, item.subcategory, request.video_script
        );
        Ok((item, request))
    }

    async fn finish(
        &self,
        handle: JobHandle,
        item: ContentItem,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<JobReport, PipelineError> {
        let settings = self.driver.settings();
        let status = self
            .driver
            .await_completion(&handle, settings.poll_interval, settings.timeout, cancel)
            .await?;

        let local_paths: Vec<PathBuf> = status
            .artifacts
            .iter()
            .filter_map(|a| {
                let path = artifact_local_path(a, &self.settings.storage_dir);
                if path.is_none() {
                    warn!("Ignoring artifact outside the storage dir: {}", a);
                }
                path
            })
            .collect();
        let mut report = JobReport {
            handle,
            item,
            script: request.video_script,
            artifacts: status.artifacts,
            local_paths,
            upload: UploadOutcome::NotConfigured,
        };
        if let Some(stage) = &self.upload {
            report.upload = self.hand_off(stage, &report).await;
        }
        Ok(report)
    }

    async fn hand_off(&self, stage: &UploadStage, report: &JobReport) -> UploadOutcome {
        let mut log = stage.log.lock().await;
        if log.remaining_today(self.settings.daily_upload_limit) == 0 {
            warn!(
                "Daily upload limit ({}) reached; keeping {} local",
                self.settings.daily_upload_limit, report.handle
            );
            return UploadOutcome::LimitReached;
        }

        let Some(video) = report.local_paths.first() else {
            warn!("Task {} produced no local video to upload", report.handle);
            return UploadOutcome::Failed("job produced no videos".into());
        };
        if !video.exists() {
            warn!("Video file not found: {}", video.display());
            return UploadOutcome::Failed(format!("video file not found: {}", video.display()));
        }

        let meta = UploadMetadata::for_item(&report.item);
        let result = stage.uploader.upload(video, &meta).await;
        let logged = match &result {
            Ok(receipt) => UploadResult::Uploaded(receipt.clone()),
            Err(e) => UploadResult::Error {
                error: e.to_string(),
            },
        };
        let entry = UploadLogEntry {
            task_id: report.handle.to_string(),
            video_path: video.display().to_string(),
            fact: report.item.text.clone(),
            category: report.item.category.clone(),
            upload_result: logged,
            timestamp: Local::now(),
        };
        if let Err(e) = log.record(entry) {
            warn!("Could not write upload log: {:#}", e);
        }

        match result {
            Ok(receipt) => {
                info!("Uploaded {} -> {}", report.handle, receipt.url);
                UploadOutcome::Uploaded(receipt)
            }
            Err(e) => {
                error!("Upload of {} failed: {:#}", report.handle, e);
                UploadOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    /// Refuses to start a job that could not be uploaded anyway, before a
    /// fact is drawn from the rotator.
    async fn check_upload_quota(&self) -> Result<(), PipelineError> {
        let Some(stage) = &self.upload else {
            return Ok(());
        };
        let limit = self.settings.daily_upload_limit;
        if stage.log.lock().await.remaining_today(limit) == 0 {
            warn!("Daily upload limit ({}) reached; not generating", limit);
            return Err(PipelineError::UploadLimitReached { limit });
        }
        Ok(())
    }

    pub async fn run_single(&self, cancel: &CancellationToken) -> Result<JobReport, PipelineError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled.into());
        }
        self.check_upload_quota().await?;
        let (item, request) = self.prepare().await?;
        let handle = self.driver.submit(&request).await?;
        *self.last_submit.lock().await = Some(self.timer.now());
        self.finish(handle, item, request, cancel).await
    }

    /// Runs `count` jobs one after another with the courtesy delay between
    /// them. A failed job is recorded and the batch moves on.
    pub async fn run_batch(&self, count: usize, cancel: &CancellationToken) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            info!("Generating video {}/{}", index + 1, count);
            let result = self.run_single(cancel).await;
            log_entry(index, &result);
            entries.push(BatchEntry { index, result });

            if cancel.is_cancelled() {
                warn!("Batch cancelled after {} of {} jobs", index + 1, count);
                break;
            }
            if index + 1 < count {
                info!("Waiting {:?} before next generation", self.settings.delay);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!("Batch cancelled during delay");
                        break;
                    }
                    _ = self.timer.sleep(self.settings.delay) => {}
                }
            }
        }
        entries
    }

    /// Runs up to `concurrency` job lifecycles at once. Submissions are still
    /// paced by the courtesy delay; poll loops overlap.
    pub async fn run_batch_concurrent(
        &self,
        count: usize,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Vec<BatchEntry> {
        let mut entries: Vec<BatchEntry> = futures::stream::iter(0..count)
            .map(|index| async move {
                let result = self.paced_job(cancel).await;
                log_entry(index, &result);
                BatchEntry { index, result }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
        entries.sort_by_key(|e| e.index);
        entries
    }

    async fn paced_job(&self, cancel: &CancellationToken) -> Result<JobReport, PipelineError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled.into());
        }
        let (item, request, handle) = {
            let mut last = self.last_submit.lock().await;
            if let Some(prev) = *last {
                let since = self.timer.now().saturating_duration_since(prev);
                if let Some(wait) = self.settings.delay.checked_sub(since) {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(JobError::Cancelled.into()),
                        _ = self.timer.sleep(wait) => {}
                    }
                }
            }
            // A job queued behind the pacing lock may outlive the cancel.
            if cancel.is_cancelled() {
                return Err(JobError::Cancelled.into());
            }
            self.check_upload_quota().await?;
            let (item, request) = self.prepare().await?;
            let handle = self.driver.submit(&request).await;
            *last = Some(self.timer.now());
            (item, request, handle?)
        };
        self.finish(handle, item, request, cancel).await
    }
}

fn log_entry(index: usize, result: &Result<JobReport, PipelineError>) {
    match result {
        Ok(report) => info!(
            "Video {} completed: task {} ({} files)",
            index + 1,
            report.handle,
            report.artifacts.len()
        ),
        Err(e) => error!("Failed to generate video {}: {}", index + 1, e),
    }
}
