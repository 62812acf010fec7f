//! Per-invocation context handed to driver handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::RunMode;
use crate::db::Database;
use crate::remap::RenameMap;
use crate::state::MigrationSettings;

/// Everything a handler may read or update during one invocation.
///
/// Built from the run settings before a batch and folded back into them
/// after it, so handlers never touch persistence.
pub struct MigrationContext {
    pub source: Arc<dyn Database>,
    pub dest: Arc<dyn Database>,
    pub mode: RunMode,
    /// Rows per batch.
    pub limit: usize,
    /// Username renames made so far in this run.
    pub renames: RenameMap,
    /// Email renames made so far in this run.
    pub emails: RenameMap,
    /// Merge-mode position offsets per entity name.
    pub offsets: BTreeMap<String, i64>,
    /// Active driver name.
    pub driver: String,
}

impl MigrationContext {
    pub fn new(
        source: Arc<dyn Database>,
        dest: Arc<dyn Database>,
        settings: &MigrationSettings,
        limit: usize,
    ) -> Self {
        Self {
            source,
            dest,
            mode: settings.mode,
            limit: limit.max(1),
            renames: settings.renames.clone(),
            emails: settings.emails.clone(),
            offsets: settings.offsets.clone(),
            driver: settings.driver.clone(),
        }
    }

    /// Copy what handlers changed back into `settings`.
    pub fn store(self, settings: &mut MigrationSettings) {
        settings.renames = self.renames;
        settings.emails = self.emails;
        settings.offsets = self.offsets;
    }
}
