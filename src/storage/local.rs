use crate::storage::{ArtifactTier, StoredObject, TierKind};
use crate::utils::{Result, SheetTranslatorError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::warn;

/// Output directory holding generated artifacts on local disk.
#[derive(Debug, Clone)]
pub struct LocalArtifactDir {
    dir: PathBuf,
}

impl LocalArtifactDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArtifactTier for LocalArtifactDir {
    fn kind(&self) -> TierKind {
        TierKind::Local
    }

    /// Only generated artifact files are listed; uploads sharing the
    /// directory are left alone.
    async fn list(&self) -> Result<Vec<StoredObject>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !crate::storage::looks_like_artifact(&name) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(key = %name, error = %e, "Skipping unreadable artifact entry");
                    continue;
                }
            };
            let created_at: DateTime<Utc> = match metadata.modified() {
                Ok(modified) => modified.into(),
                Err(e) => {
                    warn!(key = %name, error = %e, "Skipping artifact without modification time");
                    continue;
                }
            };

            objects.push(StoredObject {
                key: name,
                created_at,
            });
        }

        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        tokio::fs::remove_file(self.path_for(key))
            .await
            .map_err(|e| SheetTranslatorError::SweepObject {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}
