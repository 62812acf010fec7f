//! Storage interface for run settings.
//!
//! The orchestrator never touches storage itself; the caller loads the
//! settings before an invocation and saves them after it. Implementations:
//!
//! - **File**: one signed JSON document per run, [`FileStateBackend`](super::FileStateBackend)
//! - **Memory**: process-local map for tests and embedding, [`MemoryStateBackend`](super::MemoryStateBackend)

use async_trait::async_trait;
use chrono::Utc;

use super::MigrationSettings;
use crate::error::Result;

/// Persistence of [`MigrationSettings`].
///
/// Implementations must be `Send + Sync` so one backend can be shared by
/// the CLI and a signal handler.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Prepare the storage location. Idempotent.
    async fn init(&self) -> Result<()>;

    /// Persist `settings`, replacing any earlier record of the same run.
    ///
    /// The record is signed on the way out; the caller's copy is untouched.
    async fn save(&self, settings: &MigrationSettings) -> Result<()>;

    /// Load the run `run_key`, verifying its signature.
    async fn load(&self, run_key: &str) -> Result<Option<MigrationSettings>>;

    /// Every stored run, most recently updated first.
    async fn list(&self) -> Result<Vec<MigrationSettings>>;

    /// Remove the record of `run_key`. Missing records are not an error.
    async fn delete(&self, run_key: &str) -> Result<()>;

    /// Backend type name for logging.
    fn backend_type(&self) -> &'static str;

    /// The most recent unfinished, unexpired run started with the
    /// configuration hashing to `config_hash`.
    async fn load_latest(&self, config_hash: &str) -> Result<Option<MigrationSettings>> {
        let now = Utc::now();
        Ok(self.list().await?.into_iter().find(|s| {
            s.config_hash == config_hash && !s.is_finished() && !s.is_expired(now)
        }))
    }
}
