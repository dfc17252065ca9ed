pub mod args;
pub mod driver;
pub mod error;
pub mod facts;
pub mod logging;
pub mod pipeline;
pub mod request;
pub mod rotator;
pub mod status;
pub mod style;
pub mod timer;
pub mod upload;
pub mod used;

pub use driver::{DriverSettings, JobDriver, JobHandle};
pub use error::{JobError, PipelineError, RotatorError};
pub use facts::{ContentItem, ItemId};
pub use pipeline::{BatchEntry, BatchSettings, JobReport, Pipeline, UploadOutcome};
pub use request::{GenerationRequest, RequestBuilder, Style};
pub use rotator::ContentRotator;
pub use status::{JobOutcome, JobState, JobStatus};
pub use timer::{Timer, TokioTimer};
