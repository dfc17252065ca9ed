use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotatorError {
    #[error("content pool is empty")]
    PoolEmpty,

    #[error("failed to persist used set to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read content pool {}: {source}", path.display())]
    PoolLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid content pool: {0}")]
    PoolFormat(String),
}

/// Failures of a single job lifecycle. `JobFailed` is the remote's verdict;
/// everything else is an infrastructure fault on our side of the wire.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("submission rejected (HTTP {status_code}): {body}")]
    Submission { status_code: u16, body: String },

    #[error("job failed: {message}")]
    JobFailed { message: String },

    #[error("gave up waiting after {elapsed:?}")]
    PollTimeout { elapsed: Duration },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Rotator(#[from] RotatorError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("daily upload limit ({limit}) reached")]
    UploadLimitReached { limit: usize },
}
