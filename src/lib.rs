pub mod csv_processor;
pub mod job;
pub mod notify;
pub mod server;
pub mod state;
pub mod storage;
pub mod translation;
pub mod utils;

pub use csv_processor::{ColumnBinding, CsvChunker, CsvStreamReader, CsvStreamWriter, Table};
pub use job::{
    JobOutcome, JobRequest, JobRunner, JobStatus, ProgressEvent, ProgressStream, RunnerConfig,
    TranslationJob,
};
pub use notify::{MailRelayNotifier, Notifier};
pub use state::{AppState, RetentionSweeper, SweepOutcome, SweepReport};
pub use storage::{Artifact, ArtifactStore, ArtifactTier, LocalArtifactDir, RemoteMirror};
pub use translation::{TranslationClient, Translator};
pub use utils::{AppConfig, Result, SheetTranslatorError};
