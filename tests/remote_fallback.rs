use async_trait::async_trait;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use sheet_translator::csv_processor::Table;
use sheet_translator::job::{
    run_to_completion, JobOutcome, JobRunner, ProgressEvent, RunnerConfig, TranslationJob,
};
use sheet_translator::storage::{ArtifactStore, RemoteMirror};
use sheet_translator::translation::MockTranslator;
use sheet_translator::utils::StorageConfig;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Object store that accepts reads but refuses every write.
#[derive(Debug, Default)]
struct ReadOnlyStore {
    inner: InMemory,
}

impl fmt::Display for ReadOnlyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadOnlyStore")
    }
}

fn refused() -> object_store::Error {
    object_store::Error::Generic {
        store: "read-only",
        source: "bucket is read-only".into(),
    }
}

#[async_trait]
impl ObjectStore for ReadOnlyStore {
    async fn put_opts(
        &self,
        _location: &ObjectPath,
        _payload: PutPayload,
        _opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        Err(refused())
    }

    async fn put_multipart_opts(
        &self,
        _location: &ObjectPath,
        _opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        Err(refused())
    }

    async fn get_opts(
        &self,
        location: &ObjectPath,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, _location: &ObjectPath) -> object_store::Result<()> {
        Err(refused())
    }

    fn list(&self, prefix: Option<&ObjectPath>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&ObjectPath>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, _from: &ObjectPath, _to: &ObjectPath) -> object_store::Result<()> {
        Err(refused())
    }

    async fn copy_if_not_exists(
        &self,
        _from: &ObjectPath,
        _to: &ObjectPath,
    ) -> object_store::Result<()> {
        Err(refused())
    }
}

fn store_with_broken_mirror(dir: &Path) -> ArtifactStore {
    let config = StorageConfig {
        output_dir: dir.to_path_buf(),
        ..StorageConfig::default()
    };
    ArtifactStore::new(&config, "http://test.local", Duration::from_secs(3600))
        .with_remote(RemoteMirror::new(Arc::new(ReadOnlyStore::default()), "translated/"))
}

#[tokio::test]
async fn failed_mirror_keeps_the_local_artifact_and_link() {
    let dir = tempdir().unwrap();
    let store = store_with_broken_mirror(dir.path());

    let artifact = store
        .persist(&Table::from_column("source", &["Hallo"]))
        .await
        .unwrap();

    assert!(artifact.remote_key.is_none());
    assert!(artifact.access_url.is_none());
    assert!(artifact.local_path.exists());
    assert_eq!(
        artifact.access_reference(),
        format!("http://test.local/download/{}", artifact.name)
    );
    assert_eq!(store.open(&artifact.name).await.unwrap(), b"source\nHallo\n");
}

#[tokio::test]
async fn job_completes_with_local_link_when_mirror_fails() {
    let dir = tempdir().unwrap();
    let mut translator = MockTranslator::new();
    translator
        .expect_translate()
        .returning(|_, _, _| Ok("Hallo".to_string()));
    let runner = JobRunner::new(
        Arc::new(translator),
        Arc::new(store_with_broken_mirror(dir.path())),
        RunnerConfig {
            chunk_pause: Duration::ZERO,
            ..RunnerConfig::default()
        },
    );

    let mut job = TranslationJob::new("input.csv", "source", "target", "auto", "de");
    let (outcome, events) =
        run_to_completion(&runner, &mut job, Ok(Table::from_column("source", &["Hello"]))).await;

    let JobOutcome::Completed { artifact, .. } = outcome else {
        panic!("job should complete");
    };
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::completed(format!(
            "http://test.local/download/{}",
            artifact.name
        )))
    );
}
