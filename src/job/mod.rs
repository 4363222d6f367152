pub mod model;
pub mod progress;
pub mod runner;

pub use model::{progress_percent, JobRequest, JobStatus, TranslationJob};
pub use progress::{progress_channel, ProgressEvent, ProgressPublisher, ProgressStream};
pub use runner::{run_to_completion, JobOutcome, JobRunner, RunnerConfig};
