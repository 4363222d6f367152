pub mod local;
pub mod remote;

pub use local::LocalArtifactDir;
pub use remote::{RemoteMirror, CREATED_AT_TAG};

use crate::csv_processor::{table_to_csv_bytes, Table};
use crate::utils::{Result, SheetTranslatorError, StorageConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

const ARTIFACT_PREFIX: &str = "translated_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Local,
    Remote,
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierKind::Local => write!(f, "local"),
            TierKind::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl StoredObject {
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        match age.to_std() {
            Ok(age) => age > ttl,
            // Created in the future relative to `now`.
            Err(_) => false,
        }
    }
}

/// One storage tier as seen by the retention sweeper.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArtifactTier: Send + Sync {
    fn kind(&self) -> TierKind;

    async fn list(&self) -> Result<Vec<StoredObject>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// A generated output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    pub local_path: PathBuf,
    pub remote_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
    /// Presigned link into the remote tier.
    pub access_url: Option<String>,
    /// Download link served by this process.
    pub local_url: String,
}

impl Artifact {
    /// Presigned URL when one exists, otherwise the local download link.
    pub fn access_reference(&self) -> &str {
        self.access_url.as_deref().unwrap_or(&self.local_url)
    }
}

pub struct ArtifactStore {
    local: LocalArtifactDir,
    remote: Option<RemoteMirror>,
    extension: String,
    url_ttl: Duration,
    local_ttl: Duration,
    public_base_url: String,
}

impl ArtifactStore {
    pub fn new(config: &StorageConfig, public_base_url: &str, local_ttl: Duration) -> Self {
        Self {
            local: LocalArtifactDir::new(config.output_dir.clone()),
            remote: None,
            extension: config
                .artifact_extension
                .trim_start_matches('.')
                .to_string(),
            url_ttl: Duration::from_secs(config.url_ttl_hours * 60 * 60),
            local_ttl,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_remote(mut self, remote: RemoteMirror) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn local(&self) -> &LocalArtifactDir {
        &self.local
    }

    pub fn remote(&self) -> Option<&RemoteMirror> {
        self.remote.as_ref()
    }

    fn generate_name(&self) -> (String, String) {
        let id = Uuid::new_v4().simple().to_string();
        let name = format!("{}{}.{}", ARTIFACT_PREFIX, id, self.extension);
        (id, name)
    }

    /// Writes the table locally, then mirrors it remotely.
    ///
    /// A local failure is fatal. A remote failure only costs the presigned
    /// link: the artifact stays reachable through the local download URL.
    pub async fn persist(&self, table: &Table) -> Result<Artifact> {
        let bytes = table_to_csv_bytes(table)
            .map_err(|e| SheetTranslatorError::Storage(format!("Error serialising table: {}", e)))?;

        let (id, name) = self.generate_name();
        let local_path = self.local.write(&name, &bytes).await.map_err(|e| {
            SheetTranslatorError::Storage(format!("Error saving output file: {}", e))
        })?;
        let created_at = Utc::now();

        let mut artifact = Artifact {
            id,
            local_url: format!("{}/download/{}", self.public_base_url, name),
            name,
            local_path,
            remote_key: None,
            created_at,
            ttl_secs: self.local_ttl.as_secs(),
            access_url: None,
        };

        if let Some(remote) = &self.remote {
            match remote.upload(&artifact.name, bytes, created_at).await {
                Ok(key) => {
                    match remote.presign(&key, self.url_ttl).await {
                        Ok(url) => artifact.access_url = url,
                        Err(e) => {
                            warn!(artifact = %artifact.name, error = %e, "Failed to sign artifact URL, falling back to local link");
                        }
                    }
                    artifact.remote_key = Some(key);
                }
                Err(e) => {
                    warn!(artifact = %artifact.name, error = %e, "Remote mirror failed, artifact is local only");
                }
            }
        }

        info!(
            artifact = %artifact.name,
            remote = artifact.remote_key.is_some(),
            presigned = artifact.access_url.is_some(),
            "Artifact persisted"
        );

        Ok(artifact)
    }

    /// Reads an artifact by its generated name, local tier first.
    pub async fn open(&self, name: &str) -> Result<Vec<u8>> {
        if !self.is_artifact_name(name) {
            return Err(SheetTranslatorError::InvalidArtifactName(name.to_string()));
        }

        if let Some(bytes) = self.local.read(name).await? {
            return Ok(bytes);
        }

        if let Some(remote) = &self.remote {
            if let Some(bytes) = remote.fetch(&remote.key_for(name)).await? {
                return Ok(bytes);
            }
        }

        Err(SheetTranslatorError::ArtifactNotFound(name.to_string()))
    }

    pub fn is_artifact_name(&self, name: &str) -> bool {
        looks_like_artifact(name)
            && name
                .rsplit_once('.')
                .map(|(_, ext)| ext == self.extension)
                .unwrap_or(false)
    }
}

/// `translated_<uuid>.<ext>` with nothing that could escape a directory.
pub fn looks_like_artifact(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(ARTIFACT_PREFIX) else {
        return false;
    };
    let Some((id, ext)) = rest.rsplit_once('.') else {
        return false;
    };

    Uuid::parse_str(id).is_ok()
        && !ext.is_empty()
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
