//! JSON file state backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::backend::StateBackend;
use super::MigrationSettings;
use crate::error::{MigrateError, Result};

/// Stores each run as `{dir}/{run_key}.json`.
///
/// Writes go to a temporary file that is renamed over the target, so an
/// interrupted save leaves the previous record intact.
pub struct FileStateBackend {
    dir: PathBuf,
}

impl FileStateBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record of `run_key`.
    pub fn path_of(&self, run_key: &str) -> Result<PathBuf> {
        if run_key.is_empty()
            || !run_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(MigrateError::State(format!("Invalid run key: {:?}", run_key)));
        }
        Ok(self.dir.join(format!("{}.json", run_key)))
    }

    async fn read(path: &Path) -> Result<MigrationSettings> {
        let content = tokio::fs::read_to_string(path).await?;
        let settings: MigrationSettings = serde_json::from_str(&content)?;
        settings.verify()?;
        Ok(settings)
    }
}

#[async_trait]
impl StateBackend for FileStateBackend {
    async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn save(&self, settings: &MigrationSettings) -> Result<()> {
        let path = self.path_of(&settings.run_key)?;
        let mut signed = settings.clone();
        signed.sign()?;
        let content = serde_json::to_string_pretty(&signed)?;

        self.init().await?;
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &content).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        debug!("Saved run {} to {}", settings.run_key, path.display());
        Ok(())
    }

    async fn load(&self, run_key: &str) -> Result<Option<MigrationSettings>> {
        let path = self.path_of(run_key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Self::read(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<MigrationSettings>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut all = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path).await {
                Ok(settings) => all.push(settings),
                Err(e) => warn!("Ignoring unreadable state file {}: {}", path.display(), e),
            }
        }
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    async fn delete(&self, run_key: &str) -> Result<()> {
        let path = self.path_of(run_key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}
