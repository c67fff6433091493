use async_trait::async_trait;
use minke_dns_application::ports::{TranslationSnapshot, TranslationStore};
use minke_dns_domain::DomainError;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Translation table kept as a JSON document on disk.
pub struct JsonTranslationStore {
    path: PathBuf,
}

impl JsonTranslationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TranslationStore for JsonTranslationStore {
    async fn load(&self) -> Result<Option<TranslationSnapshot>, DomainError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DomainError::IoError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let snapshot: TranslationSnapshot = serde_json::from_str(&contents).map_err(|e| {
            DomainError::IoError(format!("Corrupt translation table {}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), mappings = snapshot.mappings.len(), "Translation table loaded");
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &TranslationSnapshot) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::IoError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| DomainError::IoError(format!("Failed to encode translations: {}", e)))?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).await.map_err(|e| {
            DomainError::IoError(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        fs::rename(&staging, &self.path).await.map_err(|e| {
            DomainError::IoError(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
