use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::JobError;
use crate::request::GenerationRequest;
use crate::status::{JobOutcome, JobStatus, Observation, PollMachine, Step, decode_status};
use crate::timer::Timer;

/// Task id handed out by the rendering service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// `None` polls until the remote reaches a terminal state.
    pub timeout: Option<Duration>,
    pub max_malformed: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(30 * 60)),
            max_malformed: 3,
        }
    }
}

/// Submits render jobs and polls them to a terminal state. One poll loop per
/// handle; nothing guards against two callers polling the same job.
pub struct JobDriver {
    http: reqwest::Client,
    base_url: String,
    timer: Arc<dyn Timer>,
    settings: DriverSettings,
}

impl JobDriver {
    pub fn new(
        base_url: impl Into<String>,
        timer: Arc<dyn Timer>,
        settings: DriverSettings,
    ) -> Result<Self, JobError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timer,
            settings,
        })
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, JobError> {
        request.validate()?;
        let url = format!("{}/api/v1/videos", self.base_url);
        info!("Submitting job: {:.80}", request.video_script);

        let res = self.http.post(&url).json(request).send().await?;
        let status = res.status();
        let body = res.text().await?;
        debug!("Submit response ({}): {}", status, body);

        if status != StatusCode::OK {
            error!("Submission rejected with HTTP {}", status);
            return Err(JobError::Submission {
                status_code: status.as_u16(),
                body,
            });
        }

        let handle = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| match v.pointer("/data/task_id") {
                Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| JobError::Submission {
                status_code: status.as_u16(),
                body: body.clone(),
            })?;

        info!("Created task {}", handle);
        Ok(JobHandle(handle))
    }

    async fn poll_once(&self, handle: &JobHandle) -> Result<Observation, JobError> {
        let url = format!("{}/api/v1/tasks/{}", self.base_url, handle);
        let res = self.http.get(&url).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Ok(Observation::Malformed(format!("HTTP {status}: {body}")));
        }
        Ok(decode_status(&body))
    }

    /// Polls until the job reaches a terminal state and reports which one.
    /// Infrastructure problems (timeouts, persistent garbage, cancellation,
    /// transport) come back as `Err`.
    pub async fn drive(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, JobError> {
        let start = self.timer.now();
        let mut machine = PollMachine::new(self.settings.max_malformed);

        loop {
            if cancel.is_cancelled() {
                info!("Polling of {} cancelled", handle);
                return Err(JobError::Cancelled);
            }

            let observation = self.poll_once(handle).await?;
            let elapsed = self.timer.now().saturating_duration_since(start);
            if let Observation::Status(s) = &observation {
                info!(
                    "Task {}: progress {:.1}% | {:?} | {}s",
                    handle,
                    s.progress,
                    s.state,
                    elapsed.as_secs()
                );
            }

            match machine.observe(observation) {
                Step::Done(outcome) => {
                    match &outcome {
                        JobOutcome::Succeeded(s) => info!(
                            "Task {} completed after {} polls with {} videos",
                            handle,
                            machine.polls(),
                            s.artifacts.len()
                        ),
                        JobOutcome::Failed { message } => {
                            error!("Task {} failed: {}", handle, message)
                        }
                    }
                    return Ok(outcome);
                }
                Step::Fault(e) => return Err(e),
                Step::Wait => {}
            }

            if let Some(limit) = timeout {
                if elapsed >= limit {
                    warn!("Giving up on task {} after {:?}", handle, elapsed);
                    return Err(JobError::PollTimeout { elapsed });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Polling of {} cancelled", handle);
                    return Err(JobError::Cancelled);
                }
                _ = self.timer.sleep(poll_interval) => {}
            }
        }
    }

    /// Like [`JobDriver::drive`], but a remote failure becomes
    /// `JobError::JobFailed`.
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<JobStatus, JobError> {
        match self.drive(handle, poll_interval, timeout, cancel).await? {
            JobOutcome::Succeeded(status) => Ok(status),
            JobOutcome::Failed { message } => Err(JobError::JobFailed { message }),
        }
    }

    /// Submit then wait, using the configured interval and timeout.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<(JobHandle, JobStatus), JobError> {
        let handle = self.submit(request).await?;
        let status = self
            .await_completion(
                &handle,
                self.settings.poll_interval,
                self.settings.timeout,
                cancel,
            )
            .await?;
        Ok((handle, status))
    }
}
