//! Source product drivers.
//!
//! A [`Driver`] recognises one legacy forum product and hands out the
//! capability objects ([`EntityHandlers`]) that read and translate each
//! entity. Drivers hold no progress; everything a batch needs travels in
//! the [`MigrationContext`](crate::orchestrator::MigrationContext) and the
//! [`BatchHandle`].
//!
//! - [`forkbb`]: identity driver for the destination product itself
//! - [`fluxbb`]: FluxBB 1.5
//! - [`punbb`]: PunBB 1.4, composed from the FluxBB handlers

pub mod finalize;
pub mod fluxbb;
pub mod forkbb;
pub mod handler;
pub mod php;
pub mod punbb;
pub mod sink;
pub mod source;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use semver::{Version, VersionReq};
use tracing::{debug, info};

pub use handler::{Batch, BatchHandle, BatchSource, EntityHandlers, Finalizer, RowSink};
pub use source::{RowTranslator, SqlSource};

use crate::core::Value;
use crate::db::Database;
use crate::entity::Entity;
use crate::error::{MigrateError, Result};

/// A recognised source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Driver name.
    pub driver: String,
    /// Product version as reported by the source.
    pub version: String,
    /// Whether the source schema is identical to the destination schema,
    /// which allows ids to be copied verbatim.
    pub exact: bool,
}

/// Why a driver rejected a source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incompatibility {
    MissingTables(Vec<String>),
    MissingVersion,
    UnsupportedVersion { found: String, supported: String },
    Unreachable(String),
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incompatibility::MissingTables(tables) => {
                write!(f, "missing tables: {}", tables.join(", "))
            }
            Incompatibility::MissingVersion => f.write_str("no version marker in config"),
            Incompatibility::UnsupportedVersion { found, supported } => {
                write!(f, "version {} is not supported (expected {})", found, supported)
            }
            Incompatibility::Unreachable(message) => write!(f, "unreachable: {}", message),
        }
    }
}

impl From<MigrateError> for Incompatibility {
    fn from(err: MigrateError) -> Self {
        Incompatibility::Unreachable(err.to_string())
    }
}

/// One supported source product.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Human readable supported version range.
    fn supported(&self) -> &'static str;

    /// Decide whether `source` holds this product in a supported version.
    async fn detect(&self, source: &dyn Database) -> std::result::Result<Detection, Incompatibility>;

    /// The capability objects for `entity`.
    fn handlers(&self, entity: Entity) -> EntityHandlers;
}

/// Named drivers, tried in name order.
pub struct DriverRegistry {
    drivers: BTreeMap<&'static str, Arc<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: BTreeMap::new(),
        }
    }

    /// Registry with `forkbb`, `fluxbb` and `punbb`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(forkbb::ForkBbDriver::new()));
        registry.register(Arc::new(fluxbb::FluxBbDriver::new()));
        registry.register(Arc::new(punbb::PunBbDriver::new()));
        registry
    }

    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        self.drivers.insert(driver.name(), driver);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.drivers.keys().copied().collect()
    }

    /// Driver registered as `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| MigrateError::UnknownDriver(name.to_string()))
    }

    /// The first driver accepting `source`, or every driver's reason.
    pub async fn detect(&self, source: &dyn Database) -> Result<Detection> {
        let mut reasons = Vec::new();
        for (name, driver) in &self.drivers {
            match driver.detect(source).await {
                Ok(detection) => {
                    info!(
                        "Detected {} {} ({})",
                        detection.driver,
                        detection.version,
                        source.db_type()
                    );
                    return Ok(detection);
                }
                Err(reason) => {
                    debug!("Driver {} declined: {}", name, reason);
                    reasons.push((name.to_string(), reason));
                }
            }
        }
        Err(MigrateError::NoCompatibleDriver(reasons))
    }

    /// Run detection of the driver registered as `name` only.
    pub async fn detect_with(&self, name: &str, source: &dyn Database) -> Result<Detection> {
        let driver = self.get(name)?;
        driver
            .detect(source)
            .await
            .map_err(|reason| MigrateError::NoCompatibleDriver(vec![(name.to_string(), reason)]))
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Fail with the tables of `required` that `source` lacks.
pub(crate) async fn require_tables(
    source: &dyn Database,
    required: &[&str],
) -> std::result::Result<(), Incompatibility> {
    let mut missing = Vec::new();
    for table in required {
        if !source.table_exists(table).await? {
            missing.push(source.physical(table));
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Incompatibility::MissingTables(missing))
    }
}

/// `conf_value` of `name` in the source `config` table.
pub(crate) async fn config_value(source: &dyn Database, name: &str) -> Result<Option<String>> {
    let row = source
        .query_one(
            "SELECT conf_value FROM ::config WHERE conf_name = ?",
            &[Value::from(name)],
        )
        .await?;
    Ok(row.map(|r| r.text("conf_value")))
}

/// Parse a product version, accepting two-component forms like `1.5`.
pub(crate) fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    Version::parse(raw)
        .or_else(|_| Version::parse(&format!("{}.0", raw)))
        .ok()
}

/// Check the version marker `raw` against `range`.
pub(crate) fn check_version(
    raw: Option<String>,
    range: &str,
) -> std::result::Result<String, Incompatibility> {
    let raw = raw.ok_or(Incompatibility::MissingVersion)?;
    let unsupported = || Incompatibility::UnsupportedVersion {
        found: raw.clone(),
        supported: range.to_string(),
    };
    let req = VersionReq::parse(range).map_err(|_| unsupported())?;
    match parse_version(&raw) {
        Some(version) if req.matches(&version) => Ok(raw.clone()),
        _ => Err(unsupported()),
    }
}
