//! Durable object-storage mirror for generated artifacts.

use crate::storage::{ArtifactTier, StoredObject, TierKind};
use crate::utils::{Result, SheetTranslatorError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectMeta, ObjectStore, PutOptions, PutPayload, TagSet,
};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Object tag and user metadata key carrying the artifact creation time
/// (RFC 3339).
pub const CREATED_AT_TAG: &str = "created-at";

fn created_at_attribute() -> Attribute {
    Attribute::Metadata(Cow::Borrowed(CREATED_AT_TAG))
}

#[derive(Debug, Clone)]
pub struct RemoteMirror {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    prefix: String,
}

impl RemoteMirror {
    /// Mirror without URL signing; artifacts get no presigned link.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            signer: None,
            prefix: normalize_prefix(&prefix.into()),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// S3 bucket mirror. Credentials and region come from the `AWS_*` environment.
    pub fn s3_from_env(bucket: &str, prefix: &str) -> Result<Self> {
        tracing::info!(bucket, "Creating authenticated S3 client");

        let s3 = Arc::new(
            AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()?,
        );

        let store: Arc<dyn ObjectStore> = s3.clone();
        let signer: Arc<dyn Signer> = s3;
        Ok(Self::new(store, prefix).with_signer(signer))
    }

    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub async fn upload(&self, name: &str, bytes: Vec<u8>, created_at: DateTime<Utc>) -> Result<String> {
        let key = self.key_for(name);

        let stamp = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut tags = TagSet::default();
        tags.push(CREATED_AT_TAG, &stamp);
        let mut attributes = Attributes::new();
        attributes.insert(created_at_attribute(), stamp.into());

        let opts = PutOptions {
            tags,
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&Path::from(key.as_str()), PutPayload::from(bytes), opts)
            .await?;

        Ok(key)
    }

    /// `Ok(None)` when the backend cannot sign URLs.
    pub async fn presign(&self, key: &str, expires_in: Duration) -> Result<Option<String>> {
        let Some(signer) = &self.signer else {
            return Ok(None);
        };

        let url = signer
            .signed_url(reqwest::Method::GET, &Path::from(key), expires_in)
            .await?;
        Ok(Some(url.to_string()))
    }

    pub async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.store.get(&Path::from(key)).await {
            Ok(result) => Ok(Some(result.bytes().await?.to_vec())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Creation time stamped on upload, or `last_modified` for objects
    /// written without one.
    async fn created_at(&self, meta: &ObjectMeta) -> DateTime<Utc> {
        let opts = GetOptions {
            head: true,
            ..Default::default()
        };

        let stamped = match self.store.get_opts(&meta.location, opts).await {
            Ok(result) => result
                .attributes
                .get(&created_at_attribute())
                .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
                .map(|t| t.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(key = %meta.location, error = %e, "Failed to read artifact metadata");
                None
            }
        };

        stamped.unwrap_or(meta.last_modified)
    }
}

#[async_trait]
impl ArtifactTier for RemoteMirror {
    fn kind(&self) -> TierKind {
        TierKind::Remote
    }

    async fn list(&self) -> Result<Vec<StoredObject>> {
        let trimmed = self.prefix.trim_end_matches('/');
        let prefix = (!trimmed.is_empty()).then(|| Path::from(trimmed));

        let mut stream = self.store.list(prefix.as_ref());
        let mut objects = Vec::new();

        while let Some(result) = stream.next().await {
            let meta = result?;
            let created_at = self.created_at(&meta).await;
            objects.push(StoredObject {
                key: meta.location.to_string(),
                created_at,
            });
        }

        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .delete(&Path::from(key))
            .await
            .map_err(|e| SheetTranslatorError::SweepObject {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn mirror() -> RemoteMirror {
        RemoteMirror::new(Arc::new(InMemory::new()), "translated")
    }

    #[test]
    fn prefix_is_normalised() {
        assert_eq!(normalize_prefix("/translated/"), "translated/");
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(mirror().key_for("a.csv"), "translated/a.csv");
    }

    #[tokio::test]
    async fn upload_then_list_and_fetch() {
        let remote = mirror();
        let key = remote
            .upload("translated_x.csv", b"h\n1\n".to_vec(), Utc::now())
            .await
            .unwrap();

        let listed = remote.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, key);

        let bytes = remote.fetch(&key).await.unwrap().unwrap();
        assert_eq!(bytes, b"h\n1\n");
        assert!(remote.fetch("translated/missing.csv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_reports_the_stamped_creation_time() {
        let remote = mirror();
        let created = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        remote
            .upload("translated_old.csv", b"h\n".to_vec(), created)
            .await
            .unwrap();

        let listed = remote.list().await.unwrap();
        assert_eq!(listed[0].created_at, created);
    }

    #[tokio::test]
    async fn unstamped_objects_fall_back_to_last_modified() {
        let store = Arc::new(InMemory::new());
        store
            .put(
                &Path::from("translated/translated_raw.csv"),
                PutPayload::from(b"h\n".to_vec()),
            )
            .await
            .unwrap();
        let written = store
            .head(&Path::from("translated/translated_raw.csv"))
            .await
            .unwrap()
            .last_modified;

        let remote = RemoteMirror::new(store, "translated");
        let listed = remote.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_at, written);
    }

    #[tokio::test]
    async fn unsigned_backend_yields_no_url() {
        let remote = mirror();
        let url = remote
            .presign("translated/a.csv", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.is_none());
    }
}
