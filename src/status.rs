//! Task status snapshots and the pure state machine that decides when a poll
//! loop is finished.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::JobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Maps the service's integer code. `1` succeeded, `-1` failed, `0` not
    /// started, anything else in progress.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => JobState::Succeeded,
            -1 => JobState::Failed,
            0 => JobState::Pending,
            _ => JobState::Running,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: f64,
    pub artifacts: Vec<String>,
    pub error: Option<String>,
}

/// What one poll produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Status(JobStatus),
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    data: Option<StatusData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    state: Option<i64>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    videos: Option<Vec<String>>,
}

/// Decodes a `GET /api/v1/tasks/{id}` body. `data.state` is required;
/// progress defaults to 0 and the video list to empty.
pub fn decode_status(body: &str) -> Observation {
    let envelope: StatusEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => return Observation::Malformed(format!("undecodable status: {e}")),
    };
    let Some(data) = envelope.data else {
        return Observation::Malformed(format!("no data in status: {body}"));
    };
    let Some(code) = data.state else {
        return Observation::Malformed(format!("no state in status: {body}"));
    };

    let state = JobState::from_code(code);
    let progress = data.progress.unwrap_or(0.0);
    let (artifacts, error) = match state {
        JobState::Succeeded => (data.videos.unwrap_or_default(), None),
        JobState::Failed => (
            Vec::new(),
            Some(envelope.message.unwrap_or_else(|| "Task failed".to_string())),
        ),
        _ => (Vec::new(), None),
    };
    Observation::Status(JobStatus {
        state,
        progress,
        artifacts,
        error,
    })
}

/// Business-level end of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(JobStatus),
    Failed { message: String },
}

#[derive(Debug)]
pub enum Step {
    Wait,
    Done(JobOutcome),
    Fault(JobError),
}

#[derive(Debug)]
pub struct PollMachine {
    max_malformed: u32,
    malformed_streak: u32,
    polls: u32,
    last_progress: f64,
}

impl PollMachine {
    pub fn new(max_malformed: u32) -> Self {
        Self {
            max_malformed,
            malformed_streak: 0,
            polls: 0,
            last_progress: 0.0,
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn observe(&mut self, observation: Observation) -> Step {
        self.polls += 1;
        let status = match observation {
            Observation::Malformed(reason) => {
                self.malformed_streak += 1;
                warn!(
                    "Malformed status ({}/{}): {}",
                    self.malformed_streak, self.max_malformed, reason
                );
                if self.malformed_streak > self.max_malformed {
                    return Step::Fault(JobError::Protocol { message: reason });
                }
                return Step::Wait;
            }
            Observation::Status(status) => status,
        };
        self.malformed_streak = 0;

        if status.progress < self.last_progress {
            debug!(
                "Progress went backwards: {:.1}% -> {:.1}%",
                self.last_progress, status.progress
            );
        }
        self.last_progress = status.progress;

        match status.state {
            JobState::Failed => Step::Done(JobOutcome::Failed {
                message: status.error.unwrap_or_default(),
            }),
            // success needs both the state and full progress
            JobState::Succeeded if status.progress >= 100.0 => {
                Step::Done(JobOutcome::Succeeded(status))
            }
            _ => Step::Wait,
        }
    }
}
