//! # forum-migrate
//!
//! Resumable converter from legacy forum databases to ForkBB.
//!
//! The library moves a complete forum (users, forums, topics, posts, private
//! messages, polls, attachments, settings) from a FluxBB, PunBB or ForkBB
//! database into a ForkBB database with:
//!
//! - **Source drivers** detected from the source tables and version marker
//! - **Bounded batches** so every invocation stays short
//! - **Resume capability** via signed JSON state files
//! - **Foreign-key remapping** through temporary `id_old` columns
//! - **Collision renaming** of duplicate usernames and emails
//!
//! ## Example
//!
//! ```rust,no_run
//! use forum_migrate::{Config, FileStateBackend, Orchestrator, StateBackend};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> forum_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(&config).await?;
//!     let backend = FileStateBackend::new(&config.migration.state_dir);
//!     backend.init().await?;
//!
//!     let mut settings = orchestrator.start(&config).await?;
//!     let summary = orchestrator
//!         .run(&mut settings, &backend, &CancellationToken::new())
//!         .await?;
//!     println!("Migrated {} rows", summary.total_rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod db;
pub mod dialect;
pub mod driver;
pub mod entity;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod remap;
pub mod schema;
pub mod state;

// Re-exports for convenient access
pub use config::{Config, ConnectionConfig, MigrationConfig, ModeSelection};
pub use db::{Database, SqlxDatabase};
pub use dialect::DbType;
pub use driver::{Detection, DriverRegistry, Incompatibility};
pub use entity::Entity;
pub use error::{MigrateError, Result};
pub use orchestrator::{Orchestrator, RunMode, RunSummary, StepOutcome};
pub use plan::MigrationPlan;
pub use state::{FileStateBackend, MemoryStateBackend, MigrationSettings, RunStatus, StateBackend};
