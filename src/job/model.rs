use crate::utils::{Result, SheetTranslatorError, TranslationDefaults};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Parameters of a job start request. Missing fields take the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    pub input_file: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub source_col: Option<String>,
    pub target_col: Option<String>,
    pub notify_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    pub job_id: String,
    pub table_ref: String,
    pub source_column: String,
    pub target_column: String,
    pub source_lang: String,
    pub target_lang: String,
    pub notify_address: Option<String>,
    status: JobStatus,
    progress: u8,
    failure_reason: Option<String>,
}

impl TranslationJob {
    pub fn new(
        table_ref: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            table_ref: table_ref.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            notify_address: None,
            status: JobStatus::Pending,
            progress: 0,
            failure_reason: None,
        }
    }

    pub fn from_request(request: &JobRequest, defaults: &TranslationDefaults) -> Self {
        let pick = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let mut job = Self::new(
            request.input_file.clone(),
            pick(&request.source_col, &defaults.source_column),
            pick(&request.target_col, &defaults.target_column),
            pick(&request.source_lang, &defaults.source_lang),
            pick(&request.target_lang, &defaults.target_lang),
        );
        job.notify_address = request
            .notify_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        job
    }

    pub fn with_notify_address(mut self, address: impl Into<String>) -> Self {
        self.notify_address = Some(address.into());
        self
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(JobStatus::Running)
    }

    /// Progress never moves backwards; a lower value is ignored.
    pub fn advance(&mut self, percent: u8) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(self.invalid(JobStatus::Running));
        }
        self.progress = self.progress.max(percent.min(100));
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(JobStatus::Completed)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<()> {
        let allowed = match (self.status, to) {
            (JobStatus::Pending, JobStatus::Running) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Running, JobStatus::Completed) => true,
            (JobStatus::Running, JobStatus::Failed) => true,
            _ => false,
        };

        if !allowed {
            return Err(self.invalid(to));
        }

        self.status = to;
        Ok(())
    }

    fn invalid(&self, to: JobStatus) -> SheetTranslatorError {
        SheetTranslatorError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

/// Percent reported after `processed` of `total` rows.
///
/// Rounded half up, held at 99 until the last row so that 100 appears exactly once.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 || processed >= total {
        return 100;
    }

    let rounded = (processed * 200 + total) / (total * 2);
    rounded.min(99) as u8
}
