use crate::csv_processor::{ColumnBinding, CsvChunker, Table};
use crate::job::model::{progress_percent, TranslationJob};
use crate::job::progress::{progress_channel, ProgressEvent, ProgressPublisher, ProgressStream};
use crate::notify::Notifier;
use crate::storage::{Artifact, ArtifactStore};
use crate::translation::{classify, RowClass, RowOutcome, Translator};
use crate::utils::{Result, TranslationDefaults};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub chunk_size: usize,
    pub chunk_pause: Duration,
    pub event_buffer: usize,
    pub max_concurrent_jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from(&TranslationDefaults::default())
    }
}

impl From<&TranslationDefaults> for RunnerConfig {
    fn from(config: &TranslationDefaults) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
            event_buffer: config.event_buffer.max(1),
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
        }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        artifact: Artifact,
        /// Background delivery, present when the job asked for a notification.
        notification: Option<JoinHandle<Result<()>>>,
    },
    Failed(String),
    /// The subscriber went away; nothing was persisted.
    Abandoned,
}

pub struct JobRunner {
    translator: Arc<dyn Translator>,
    store: Arc<ArtifactStore>,
    notifier: Option<Arc<dyn Notifier>>,
    config: RunnerConfig,
    permits: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(translator: Arc<dyn Translator>, store: Arc<ArtifactStore>, config: RunnerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            translator,
            store,
            notifier: None,
            config,
            permits,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Spawns the job and hands back its event stream.
    ///
    /// The job waits for a worker permit before doing anything, so at most
    /// `max_concurrent_jobs` jobs talk to the translation provider at once.
    pub fn start(self: &Arc<Self>, mut job: TranslationJob, table: Result<Table>) -> ProgressStream {
        let (publisher, stream) = progress_channel(self.config.event_buffer);
        let runner = Arc::clone(self);

        tokio::spawn(async move {
            let _permit = match Arc::clone(&runner.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(job_id = %job.job_id, "Worker pool closed, dropping job");
                    return;
                }
            };

            runner.run(&mut job, table, publisher).await;
        });

        stream
    }

    pub async fn run(
        &self,
        job: &mut TranslationJob,
        table: Result<Table>,
        mut publisher: ProgressPublisher,
    ) -> JobOutcome {
        let resolved = table.and_then(|table| {
            let binding = ColumnBinding::resolve(&table, &job.source_column, &job.target_column)?;
            Ok((table, binding))
        });

        let (mut table, binding) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(job, &mut publisher, e.to_string()).await,
        };

        if let Err(e) = job.start() {
            return self.fail(job, &mut publisher, e.to_string()).await;
        }

        let total_rows = table.row_count();
        let chunks = CsvChunker::new(self.config.chunk_size).calculate_chunks(total_rows);

        info!(
            job_id = %job.job_id,
            table = %job.table_ref,
            rows = total_rows,
            chunks = chunks.len(),
            target_lang = %job.target_lang,
            "Translation job started"
        );

        if total_rows == 0 && self.report(job, &mut publisher, 0, 0).await.is_err() {
            return self.abandon(job);
        }

        let mut outcomes: Vec<RowOutcome> = Vec::with_capacity(total_rows);

        for range in &chunks {
            if range.index > 0 && !self.config.chunk_pause.is_zero() {
                tokio::time::sleep(self.config.chunk_pause).await;
            }

            for row in range.rows() {
                if publisher.subscriber_gone() {
                    return self.abandon(job);
                }

                let value = table.cell(row, binding.source).unwrap_or_default();
                let outcome = self.translate_row(job, row, value).await;
                outcomes.push(outcome);

                if self
                    .report(job, &mut publisher, outcomes.len(), total_rows)
                    .await
                    .is_err()
                {
                    return self.abandon(job);
                }
            }

            debug!(job_id = %job.job_id, chunk_index = range.index, rows = range.row_count(), "Chunk processed");
        }

        let failed_rows = outcomes.iter().filter(|o| o.is_error()).count();
        let column: Vec<String> = outcomes.into_iter().map(RowOutcome::into_cell).collect();

        if let Err(e) = table.set_column(&binding, column) {
            return self.fail(job, &mut publisher, e.to_string()).await;
        }

        let artifact = match self.store.persist(&table).await {
            Ok(artifact) => artifact,
            Err(e) => return self.fail(job, &mut publisher, e.to_string()).await,
        };

        if let Err(e) = job.complete() {
            warn!(job_id = %job.job_id, error = %e, "Job already finished");
        }

        info!(
            job_id = %job.job_id,
            rows = total_rows,
            failed_rows,
            artifact = %artifact.name,
            "Translation job completed"
        );

        if let Err(e) = publisher
            .publish(ProgressEvent::completed(artifact.access_reference()))
            .await
        {
            debug!(job_id = %job.job_id, error = %e, "Completion event not delivered");
        }

        let notification = self.notify(job, &artifact);

        JobOutcome::Completed {
            artifact,
            notification,
        }
    }

    async fn translate_row(&self, job: &TranslationJob, row: usize, value: &str) -> RowOutcome {
        match classify(value) {
            RowClass::Blank => RowOutcome::Empty,
            RowClass::Numeric => RowOutcome::Passthrough(value.to_string()),
            RowClass::Translatable => match self
                .translator
                .translate(value, &job.source_lang, &job.target_lang)
                .await
            {
                Ok(translated) => RowOutcome::Translated(translated),
                Err(e) => {
                    warn!(job_id = %job.job_id, row = row + 1, error = %e, "Error translating row");
                    RowOutcome::ErrorMarker
                }
            },
        }
    }

    async fn report(
        &self,
        job: &mut TranslationJob,
        publisher: &mut ProgressPublisher,
        processed: usize,
        total: usize,
    ) -> Result<()> {
        let percent = progress_percent(processed, total);
        job.advance(percent)?;
        publisher.publish(ProgressEvent::progress(percent)).await
    }

    async fn fail(
        &self,
        job: &mut TranslationJob,
        publisher: &mut ProgressPublisher,
        reason: String,
    ) -> JobOutcome {
        error!(job_id = %job.job_id, table = %job.table_ref, error = %reason, "Translation job failed");

        if let Err(e) = job.fail(reason.clone()) {
            warn!(job_id = %job.job_id, error = %e, "Job already finished");
        }

        if let Err(e) = publisher.publish(ProgressEvent::failed(reason.clone())).await {
            debug!(job_id = %job.job_id, error = %e, "Failure event not delivered");
        }

        JobOutcome::Failed(reason)
    }

    fn abandon(&self, job: &mut TranslationJob) -> JobOutcome {
        info!(job_id = %job.job_id, progress = job.progress(), "Subscriber disconnected, abandoning job");
        if let Err(e) = job.fail("subscriber disconnected") {
            warn!(job_id = %job.job_id, error = %e, "Job already finished");
        }
        JobOutcome::Abandoned
    }

    fn notify(&self, job: &TranslationJob, artifact: &Artifact) -> Option<JoinHandle<Result<()>>> {
        let notifier = Arc::clone(self.notifier.as_ref()?);
        let address = job.notify_address.clone()?;
        let artifact = artifact.clone();
        let job_id = job.job_id.clone();

        Some(tokio::spawn(async move {
            let result = notifier.send(&address, &artifact).await;
            match &result {
                Ok(()) => info!(job_id = %job_id, artifact = %artifact.name, "Notification sent"),
                Err(e) => warn!(job_id = %job_id, error = %e, "Notification failed"),
            }
            result
        }))
    }
}

/// Convenience for callers that want to start a job and drain its events.
pub async fn run_to_completion(
    runner: &JobRunner,
    job: &mut TranslationJob,
    table: Result<Table>,
) -> (JobOutcome, Vec<ProgressEvent>) {
    let (publisher, stream) = progress_channel(runner.config.event_buffer);
    let (outcome, events) = tokio::join!(runner.run(job, table, publisher), stream.collect());
    (outcome, events)
}
