//! Migration orchestrator - the resumable `(step, cursor)` state machine.
//!
//! Every call to [`Orchestrator::step`] performs one bounded unit of work:
//! schema setup (step 0), one batch of one entity (steps 1..K-1) or the
//! cleanup (step K). The caller persists the returned position; an
//! interrupted invocation is simply repeated.

pub mod context;
pub mod mode;

pub use context::MigrationContext;
pub use mode::{resolve, DestinationState, RunMode};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{Database, SqlxDatabase};
use crate::driver::{Batch, Detection, DriverRegistry, EntityHandlers};
use crate::entity::Entity;
use crate::error::{MigrateError, Result};
use crate::plan::{MigrationPlan, StepKind};
use crate::schema::evolver::{destination_populated, destination_revision};
use crate::schema::SchemaEvolver;
use crate::state::{MigrationSettings, StateBackend};

/// Where the run continues after one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub next_step: i64,
    pub next_cursor: i64,
    /// Rows written by this invocation.
    pub rows: u64,
    /// The run is complete.
    pub finished: bool,
    /// An entity was finalized by this invocation.
    pub finalized: bool,
}

/// Result of driving a run to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_key: String,
    pub driver: String,
    pub mode: RunMode,
    /// Invocations performed by this call.
    pub steps: u64,
    /// Rows written by this call.
    pub rows: u64,
    /// Rows written over the whole run.
    pub total_rows: u64,
    pub duration_seconds: f64,
    pub finished: bool,
}

/// Migration orchestrator.
pub struct Orchestrator {
    source: Arc<dyn Database>,
    dest: Arc<dyn Database>,
    registry: DriverRegistry,
    plan: MigrationPlan,
    limit: usize,
}

impl Orchestrator {
    /// Orchestrator over already connected databases.
    pub fn new(source: Arc<dyn Database>, dest: Arc<dyn Database>, limit: usize) -> Self {
        Self {
            source,
            dest,
            registry: DriverRegistry::with_builtins(),
            plan: MigrationPlan::default(),
            limit: limit.max(1),
        }
    }

    /// Connect both databases described by `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let max = config.migration.max_connections;
        let source = SqlxDatabase::connect(&config.source, max).await?;
        let dest = SqlxDatabase::connect(&config.target, max).await?;
        Ok(Self::new(
            Arc::new(source),
            Arc::new(dest),
            config.migration.limit,
        ))
    }

    /// Replace the driver registry.
    pub fn with_registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the entity plan.
    pub fn with_plan(mut self, plan: MigrationPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Identify the source, using the configured driver when one is named.
    pub async fn detect(&self, config: &Config) -> Result<Detection> {
        if config.migration.auto_driver() {
            self.registry.detect(self.source.as_ref()).await
        } else {
            self.registry
                .detect_with(&config.migration.driver, self.source.as_ref())
                .await
        }
    }

    /// Detect the source, resolve the run mode and create the settings of
    /// a new run positioned at step 0. Nothing is written.
    pub async fn start(&self, config: &Config) -> Result<MigrationSettings> {
        self.plan.validate()?;
        let detection = self.detect(config).await?;
        let dest = DestinationState {
            populated: destination_populated(self.dest.as_ref()).await?,
            revision: destination_revision(self.dest.as_ref()).await?,
        };
        let mode = resolve(config.migration.mode, dest, &detection)?;
        let settings = MigrationSettings::new(config, &detection, mode);
        info!(
            "Run {}: {} {} -> {} ({} mode, {} steps)",
            settings.run_key,
            detection.driver,
            detection.version,
            settings.target.location,
            mode,
            self.plan.cleanup_step() + 1
        );
        Ok(settings)
    }

    /// Perform one invocation and record its outcome in `settings`.
    ///
    /// `settings` is left untouched when the invocation fails, so the same
    /// position is attempted again by the next call.
    pub async fn step(&self, settings: &mut MigrationSettings) -> Result<StepOutcome> {
        settings.ensure_resumable()?;
        let step = settings.step;
        let cursor = settings.cursor;
        let mut ctx = MigrationContext::new(
            self.source.clone(),
            self.dest.clone(),
            settings,
            self.limit,
        );

        let outcome = match self.plan.kind(step)? {
            StepKind::Setup => self.setup(&mut ctx).await?,
            StepKind::Entity(entity) => self.entity_step(&mut ctx, step, entity, cursor).await?,
            StepKind::Cleanup => self.cleanup(step).await?,
        };

        ctx.store(settings);
        settings.record(&outcome);
        Ok(outcome)
    }

    /// Step until the run finishes, saving the settings after every
    /// invocation. Cancellation is checked between invocations.
    pub async fn run(
        &self,
        settings: &mut MigrationSettings,
        backend: &dyn StateBackend,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let mut steps = 0u64;
        let mut rows = 0u64;

        while !settings.is_finished() {
            if cancel.is_cancelled() {
                warn!(
                    "Run {} interrupted at step {} cursor {}",
                    settings.run_key, settings.step, settings.cursor
                );
                backend.save(settings).await?;
                return Err(MigrateError::Cancelled);
            }
            let outcome = self.step(settings).await?;
            backend.save(settings).await?;
            steps += 1;
            rows += outcome.rows;
        }

        let duration = started.elapsed().as_secs_f64();
        info!(
            "Run {} complete: {} rows in {:.1}s ({} invocations)",
            settings.run_key, rows, duration, steps
        );
        Ok(RunSummary {
            run_key: settings.run_key.clone(),
            driver: settings.driver.clone(),
            mode: settings.mode,
            steps,
            rows,
            total_rows: settings.rows,
            duration_seconds: duration,
            finished: settings.is_finished(),
        })
    }

    /// Remove the tracking columns of an abandoned run.
    pub async fn drop_tracking(&self) -> Result<()> {
        SchemaEvolver::new(self.dest.as_ref())
            .drop_tracking_columns(&self.plan.tracked_tables())
            .await
    }

    /// Release both connection pools.
    pub async fn close(&self) {
        self.source.close().await;
        self.dest.close().await;
    }

    async fn setup(&self, ctx: &mut MigrationContext) -> Result<StepOutcome> {
        let dest = self.dest.as_ref();
        let evolver = SchemaEvolver::new(dest).seed_content(!ctx.mode.preserves_ids());

        if ctx.mode.creates_schema() {
            if destination_populated(dest).await? {
                debug!("Destination schema already created");
            } else {
                evolver.create_destination_schema().await?;
            }
        }

        if ctx.mode.is_merge() && ctx.offsets.is_empty() {
            for entity in self.plan.entities() {
                let Some(column) = entity.position_column() else {
                    continue;
                };
                if !dest.table_exists(entity.table()).await? {
                    continue;
                }
                let offset = dest
                    .query_int(
                        &format!(
                            "SELECT COALESCE(MAX({}), 0) AS n FROM ::{}",
                            column,
                            entity.table()
                        ),
                        &[],
                    )
                    .await?;
                debug!("{}: positions offset by {}", entity, offset);
                ctx.offsets.insert(entity.name().to_string(), offset);
            }
        }

        evolver
            .add_tracking_columns(&self.plan.tracked_tables())
            .await?;

        Ok(StepOutcome {
            next_step: 1,
            next_cursor: 0,
            rows: 0,
            finished: false,
            finalized: false,
        })
    }

    async fn entity_step(
        &self,
        ctx: &mut MigrationContext,
        step: i64,
        entity: Entity,
        cursor: i64,
    ) -> Result<StepOutcome> {
        if ctx.mode.is_merge() && entity.destination_only() {
            info!("[{}] {}: skipped in merge mode", step, entity);
            return Ok(advance(step, 0, false));
        }

        let handlers = self.registry.get(&ctx.driver)?.handlers(entity);
        let mut handle = match handlers.source.begin(ctx, cursor).await? {
            Batch::Rows(handle) => handle,
            Batch::NotApplicable => {
                debug!("[{}] {}: nothing to read from the source", step, entity);
                self.finalize(ctx, &handlers, step, entity).await?;
                return Ok(advance(step, 0, true));
            }
        };

        let mut rows = 0u64;
        let mut purged = false;
        while let Some(row) = handlers.source.next_row(ctx, &mut handle).await? {
            if !purged {
                handlers.sink.purge(ctx, cursor).await?;
                purged = true;
            }
            handlers.sink.write(ctx, row).await?;
            rows += 1;
        }

        if handle.consumed() == 0 || handle.is_end() {
            if rows > 0 {
                info!("[{}] {}: {} rows", step, entity, rows);
            }
            self.finalize(ctx, &handlers, step, entity).await?;
            return Ok(advance(step, rows, true));
        }

        let last = handle.position().unwrap_or(cursor);
        info!(
            "[{}] {}: {} rows (cursor {} -> {})",
            step,
            entity,
            rows,
            cursor,
            last + 1
        );
        Ok(StepOutcome {
            next_step: step,
            next_cursor: last + 1,
            rows,
            finished: false,
            finalized: false,
        })
    }

    async fn finalize(
        &self,
        ctx: &MigrationContext,
        handlers: &EntityHandlers,
        step: i64,
        entity: Entity,
    ) -> Result<()> {
        handlers.finalizer.finalize(ctx).await?;
        info!("[{}] {}: complete", step, entity);
        Ok(())
    }

    async fn cleanup(&self, step: i64) -> Result<StepOutcome> {
        self.drop_tracking().await?;
        Ok(StepOutcome {
            next_step: step,
            next_cursor: 0,
            rows: 0,
            finished: true,
            finalized: false,
        })
    }
}

fn advance(step: i64, rows: u64, finalized: bool) -> StepOutcome {
    StepOutcome {
        next_step: step + 1,
        next_cursor: 0,
        rows,
        finished: false,
        finalized,
    }
}
