//! Capability traits composed into per-entity handlers.
//!
//! Every entity is served by three small objects: a [`BatchSource`] that
//! reads and translates rows, a [`RowSink`] that writes them, and a
//! [`Finalizer`] that runs once all rows are in. Drivers usually only
//! supply the source and take the sink and finalizer that the entity's
//! static description implies ([`EntityHandlers::standard`]).

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;

use super::finalize::{AgainFinalizer, RemapFinalizer};
use super::sink::{NullSink, TableSink};
use crate::core::Row;
use crate::entity::{Entity, Role};
use crate::error::Result;
use crate::orchestrator::MigrationContext;

/// Result of opening a batch.
pub enum Batch {
    Rows(BatchHandle),
    /// The source has nothing for this entity at all.
    NotApplicable,
}

/// Transient state of one open batch.
///
/// Holds the raw source rows in read order. `position` follows the last
/// row handed out: its old id for id cursors, its offset for ordinal
/// cursors, or a negative end marker for fixed lists.
#[derive(Debug)]
pub struct BatchHandle {
    rows: VecDeque<(i64, Row)>,
    position: Option<i64>,
    consumed: usize,
    end: bool,
}

impl BatchHandle {
    /// Handle over `(position, raw row)` pairs.
    pub fn new(rows: Vec<(i64, Row)>) -> Self {
        Self {
            rows: rows.into(),
            position: None,
            consumed: 0,
            end: false,
        }
    }

    /// Handle over a complete synthetic list; the entity ends with it.
    pub fn fixed(rows: Vec<Row>) -> Self {
        let mut handle = Self::new(rows.into_iter().map(|r| (-1, r)).collect());
        handle.end = true;
        handle
    }

    /// Next raw row; advances the position.
    pub fn pop(&mut self) -> Option<Row> {
        let (position, row) = self.rows.pop_front()?;
        self.position = Some(position);
        self.consumed += 1;
        Some(row)
    }

    /// Position of the last row handed out.
    pub fn position(&self) -> Option<i64> {
        self.position
    }

    /// Raw rows handed out so far, including rows the translator dropped.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Whether the entity has no rows beyond this batch.
    pub fn is_end(&self) -> bool {
        self.end || self.position.is_some_and(|p| p < 0)
    }
}

/// Reads one entity from the source.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Open the batch starting at `cursor`, bounded by `ctx.limit`.
    async fn begin(&self, ctx: &MigrationContext, cursor: i64) -> Result<Batch>;

    /// Translate the next row of `handle`; `None` once it is drained.
    async fn next_row(
        &self,
        ctx: &MigrationContext,
        handle: &mut BatchHandle,
    ) -> Result<Option<Row>>;
}

/// Writes translated rows into the destination.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Remove rows an interrupted attempt at the batch starting at `cursor`
    /// left behind.
    async fn purge(&self, _ctx: &MigrationContext, _cursor: i64) -> Result<u64> {
        Ok(0)
    }

    async fn write(&self, ctx: &mut MigrationContext, row: Row) -> Result<()>;
}

/// Completes an entity once every row is written.
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, ctx: &MigrationContext) -> Result<()>;
}

/// Source without rows.
pub struct NoSource;

#[async_trait]
impl BatchSource for NoSource {
    async fn begin(&self, _ctx: &MigrationContext, _cursor: i64) -> Result<Batch> {
        Ok(Batch::NotApplicable)
    }

    async fn next_row(
        &self,
        _ctx: &MigrationContext,
        handle: &mut BatchHandle,
    ) -> Result<Option<Row>> {
        Ok(handle.pop())
    }
}

/// The handlers serving one entity.
#[derive(Clone)]
pub struct EntityHandlers {
    pub source: Arc<dyn BatchSource>,
    pub sink: Arc<dyn RowSink>,
    pub finalizer: Arc<dyn Finalizer>,
}

impl EntityHandlers {
    /// `source` combined with the sink and finalizer `entity` calls for.
    pub fn standard(entity: Entity, source: Arc<dyn BatchSource>) -> Self {
        let finalizer: Arc<dyn Finalizer> = match entity.role() {
            Role::Again => Arc::new(AgainFinalizer::new(entity)),
            Role::Copy | Role::FixedList => Arc::new(RemapFinalizer::new(entity)),
        };
        let sink: Arc<dyn RowSink> = match entity.role() {
            Role::Again => Arc::new(NullSink),
            Role::Copy | Role::FixedList => Arc::new(TableSink::new(entity)),
        };
        Self {
            source,
            sink,
            finalizer,
        }
    }

    /// Handlers for an entity the source product does not have.
    pub fn not_applicable(entity: Entity) -> Self {
        Self::standard(entity, Arc::new(NoSource))
    }
}
