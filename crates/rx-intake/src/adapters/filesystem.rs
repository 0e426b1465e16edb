use crate::domain::entities::ReceiptId;
use crate::domain::errors::CollaboratorError;
use crate::ports::outbound::ImageStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Images and documents as files in one local directory.
///
/// Layout: `<dir>/<receipt_id>_<index>.jpg` and `<dir>/<receipt_id>_<index>.pdf`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn image_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.jpg"))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf, CollaboratorError> {
        let path = self.image_path(stem);
        let write_err = |e: std::io::Error| CollaboratorError::LocalWrite {
            path: path.clone(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        // Write aside and rename so a crash never leaves a truncated image.
        let partial = self.dir.join(format!(".{stem}.jpg.part"));
        tokio::fs::write(&partial, bytes).await.map_err(write_err)?;
        tokio::fs::rename(&partial, &path).await.map_err(write_err)?;
        Ok(path)
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>, CollaboratorError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| CollaboratorError::LocalRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    fn document_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.pdf"))
    }

    fn highest_sequence(&self, day: NaiveDate) -> Option<u32> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("[rx-intake] cannot scan {}: {}", self.dir.display(), e);
                }
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| receipt_from_file_name(&name))
            .filter(|id| id.day() == day)
            .map(|id| id.sequence())
            .max()
    }
}

/// `202406140003_2.jpg` → `202406140003`.
fn receipt_from_file_name(name: &str) -> Option<ReceiptId> {
    let stem = name.strip_suffix(".jpg").or_else(|| name.strip_suffix(".pdf"))?;
    let (receipt, index) = stem.rsplit_once('_')?;
    index.parse::<u32>().ok()?;
    receipt.parse().ok()
}
