//! Persisted run settings for resumable migrations.
//!
//! A run is a sequence of short invocations. Everything an invocation needs
//! to pick up where the previous one stopped lives in [`MigrationSettings`]:
//! the `(step, cursor)` position, the rename maps built by collision
//! resolution and the detected driver. Backends store it between
//! invocations (see [`backend`]).

pub mod backend;
mod file;
mod memory;

pub use backend::StateBackend;
pub use file::FileStateBackend;
pub use memory::MemoryStateBackend;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{Config, ConnectionConfig};
use crate::dialect::DbType;
use crate::driver::Detection;
use crate::error::{MigrateError, Result};
use crate::orchestrator::{RunMode, StepOutcome};
use crate::remap::RenameMap;

type HmacSha256 = Hmac<Sha256>;

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
}

/// Connection parameters recorded with a run, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    #[serde(rename = "type")]
    pub db_type: DbType,
    pub location: String,
    pub prefix: String,
}

impl From<&ConnectionConfig> for ConnectionSummary {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            db_type: config.db_type,
            location: config.display_location(),
            prefix: config.prefix.clone(),
        }
    }
}

/// Persisted record of one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSettings {
    /// Unique run identifier.
    pub run_key: String,

    /// SHA256 hash of the configuration that started the run.
    pub config_hash: String,

    pub source: ConnectionSummary,
    pub target: ConnectionSummary,

    /// Name of the detected source driver.
    pub driver: String,

    /// Source product version reported by the driver.
    pub version: String,

    pub mode: RunMode,

    /// Next step to execute.
    pub step: i64,

    /// Cursor within `step`.
    pub cursor: i64,

    /// Usernames changed by collision resolution, original to final.
    #[serde(default)]
    pub renames: RenameMap,

    /// Email addresses changed by collision resolution.
    #[serde(default)]
    pub emails: RenameMap,

    /// Display-position offsets applied in merge mode, per entity.
    #[serde(default)]
    pub offsets: BTreeMap<String, i64>,

    /// Rows written so far.
    #[serde(default)]
    pub rows: u64,

    pub status: RunStatus,

    /// Hours the run stays resumable after its last step.
    pub ttl_hours: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// HMAC-SHA256 over the record (without this field), keyed with
    /// `config_hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac: Option<String>,
}

impl MigrationSettings {
    /// Settings for a new run positioned at step 0.
    pub fn new(config: &Config, detection: &Detection, mode: RunMode) -> Self {
        let now = Utc::now();
        let ttl_hours = config.migration.state_ttl_hours;
        Self {
            run_key: uuid::Uuid::new_v4().to_string(),
            config_hash: config.hash(),
            source: ConnectionSummary::from(&config.source),
            target: ConnectionSummary::from(&config.target),
            driver: detection.driver.clone(),
            version: detection.version.clone(),
            mode,
            step: 0,
            cursor: 0,
            renames: RenameMap::new(),
            emails: RenameMap::new(),
            offsets: BTreeMap::new(),
            rows: 0,
            status: RunStatus::Running,
            ttl_hours,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(i64::from(ttl_hours)),
            completed_at: None,
            hmac: None,
        }
    }

    /// Record the outcome of a successful invocation and extend the expiry.
    pub fn record(&mut self, outcome: &StepOutcome) {
        let now = Utc::now();
        self.step = outcome.next_step;
        self.cursor = outcome.next_cursor;
        self.rows += outcome.rows;
        self.updated_at = now;
        self.expires_at = now + Duration::hours(i64::from(self.ttl_hours));
        if outcome.finished {
            self.status = RunStatus::Completed;
            self.completed_at = Some(now);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Fail unless the run can take another step.
    pub fn ensure_resumable(&self) -> Result<()> {
        if self.is_finished() {
            return Err(MigrateError::State(format!(
                "Run {} is already complete",
                self.run_key
            )));
        }
        if self.is_expired(Utc::now()) {
            return Err(MigrateError::StateExpired(self.run_key.clone()));
        }
        Ok(())
    }

    /// Fail unless the run was started with the configuration hashing to
    /// `config_hash`.
    pub fn validate_config(&self, config_hash: &str) -> Result<()> {
        if self.config_hash != config_hash {
            return Err(MigrateError::State(format!(
                "Run {} was started with a different configuration",
                self.run_key
            )));
        }
        Ok(())
    }

    fn compute_hmac(&self) -> Result<String> {
        let mut unsigned = self.clone();
        unsigned.hmac = None;

        let content = serde_json::to_string(&unsigned)?;
        let mut mac = HmacSha256::new_from_slice(self.config_hash.as_bytes())
            .map_err(|e| MigrateError::State(format!("Failed to create HMAC: {}", e)))?;
        mac.update(content.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Attach a fresh signature.
    pub fn sign(&mut self) -> Result<()> {
        self.hmac = Some(self.compute_hmac()?);
        Ok(())
    }

    /// Check the signature; unsigned records are rejected.
    pub fn verify(&self) -> Result<()> {
        let stored = self.hmac.as_deref().ok_or_else(|| {
            MigrateError::State(format!("Settings of run {} are not signed", self.run_key))
        })?;
        if stored != self.compute_hmac()? {
            return Err(MigrateError::State(format!(
                "Settings of run {} failed the integrity check (HMAC mismatch)",
                self.run_key
            )));
        }
        Ok(())
    }
}
