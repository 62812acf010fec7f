//! In-memory state backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::backend::StateBackend;
use super::MigrationSettings;
use crate::error::{MigrateError, Result};

/// Keeps run settings in a process-local map.
#[derive(Default)]
pub struct MemoryStateBackend {
    runs: Mutex<HashMap<String, MigrationSettings>>,
}

impl MemoryStateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MigrationSettings>>> {
        self.runs
            .lock()
            .map_err(|_| MigrateError::State("State map lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateBackend for MemoryStateBackend {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn save(&self, settings: &MigrationSettings) -> Result<()> {
        let mut signed = settings.clone();
        signed.sign()?;
        self.runs()?.insert(signed.run_key.clone(), signed);
        Ok(())
    }

    async fn load(&self, run_key: &str) -> Result<Option<MigrationSettings>> {
        let found = self.runs()?.get(run_key).cloned();
        if let Some(settings) = &found {
            settings.verify()?;
        }
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<MigrationSettings>> {
        let mut all: Vec<MigrationSettings> = self.runs()?.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    async fn delete(&self, run_key: &str) -> Result<()> {
        self.runs()?.remove(run_key);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
