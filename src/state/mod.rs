pub mod cleanup;

pub use cleanup::{RetentionSweeper, SweepOutcome, SweepReport, SweeperHandle};

use crate::job::{JobRunner, RunnerConfig};
use crate::notify::{MailRelayNotifier, Notifier};
use crate::storage::{ArtifactStore, RemoteMirror};
use crate::translation::{TranslationClient, Translator};
use crate::utils::{AppConfig, Result};
use std::sync::Arc;

/// Everything a request handler needs, built once from configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub runner: Arc<JobRunner>,
    pub store: Arc<ArtifactStore>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let translator: Arc<dyn Translator> = Arc::new(TranslationClient::new(&config.translation)?);
        let notifier = MailRelayNotifier::from_config(&config.notify)?
            .map(|n| Arc::new(n) as Arc<dyn Notifier>);

        Self::assemble(config, translator, notifier)
    }

    /// Builds the state around caller-provided collaborators.
    pub fn assemble(
        config: AppConfig,
        translator: Arc<dyn Translator>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let mut store = ArtifactStore::new(
            &config.storage,
            &config.server.public_base_url,
            config.retention.local_ttl(),
        );
        if let Some(bucket) = &config.storage.bucket {
            store = store.with_remote(RemoteMirror::s3_from_env(bucket, &config.storage.prefix)?);
        }
        let store = Arc::new(store);

        let mut runner = JobRunner::new(
            translator,
            Arc::clone(&store),
            RunnerConfig::from(&config.translation),
        );
        if let Some(notifier) = notifier {
            runner = runner.with_notifier(notifier);
        }

        Ok(Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
            store,
        })
    }

    /// One sweeper per configured storage tier.
    pub fn sweepers(&self) -> Vec<RetentionSweeper> {
        let retention = &self.config.retention;
        let mut sweepers = vec![RetentionSweeper::new(
            Arc::new(self.store.local().clone()),
            retention.local_ttl(),
            retention.local_interval(),
        )];

        if let Some(remote) = self.store.remote() {
            sweepers.push(RetentionSweeper::new(
                Arc::new(remote.clone()),
                retention.remote_ttl(),
                retention.remote_interval(),
            ));
        }

        sweepers
    }
}
