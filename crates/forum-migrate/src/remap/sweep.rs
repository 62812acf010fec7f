//! Deferred foreign-key resolution.
//!
//! Writers store an unresolved reference as the negated old id. A sweep
//! turns every negative value of a column into the new id of the referenced
//! row, then zeroes or deletes what is left. Positive values are never
//! touched, so a sweep can be repeated after an interruption.

use tracing::debug;

use super::lookup::IdRemapper;
use crate::core::Value;
use crate::db::{Database, Statement};
use crate::entity::{Entity, OnOrphan, Remap};
use crate::error::{MigrateError, Result};
use crate::schema::table;

/// Builds and runs the remap statements of one entity.
pub struct RemapSweep<'a> {
    dest: &'a dyn Database,
}

impl<'a> RemapSweep<'a> {
    pub fn new(dest: &'a dyn Database) -> Self {
        Self { dest }
    }

    /// Resolve every remapped column of `entity` in a single transaction.
    pub async fn run(&self, entity: Entity) -> Result<u64> {
        let statements = self.statements(entity).await?;
        if statements.is_empty() {
            return Ok(0);
        }
        let affected = self.dest.execute_batch(&statements).await?;
        debug!("{}: remap sweep touched {} rows", entity, affected);
        Ok(affected)
    }

    /// The statements [`run`](Self::run) executes.
    pub async fn statements(&self, entity: Entity) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for remap in entity.remaps() {
            if remap.target.table() == entity.table() {
                self.self_reference(entity, remap, &mut statements).await?;
            } else {
                statements.push(correlated_update(entity, remap)?);
            }
            statements.push(orphans(entity, remap));
        }
        Ok(statements)
    }

    // Correlated subqueries on the table being updated are rejected by
    // MySQL, so self references are resolved through explicit lookups.
    async fn self_reference(
        &self,
        entity: Entity,
        remap: &Remap,
        statements: &mut Vec<Statement>,
    ) -> Result<()> {
        let sql = format!(
            "SELECT DISTINCT {col} AS v FROM ::{t} WHERE {col} < 0",
            col = remap.column,
            t = entity.table()
        );
        let pending: Vec<i64> = self
            .dest
            .query(&sql, &[])
            .await?
            .iter()
            .map(|r| -r.int("v"))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let resolved = IdRemapper::new(self.dest)
            .lookup_many(remap.target, &pending)
            .await?;
        let update = format!(
            "UPDATE ::{} SET {col} = ? WHERE {col} = ?",
            entity.table(),
            col = remap.column
        );
        for (old, new) in resolved {
            statements.push(Statement::new(
                update.clone(),
                vec![Value::from(new), Value::from(-old)],
            ));
        }
        Ok(())
    }
}

fn correlated_update(entity: Entity, remap: &Remap) -> Result<Statement> {
    let key = table(remap.target.table())
        .and_then(|def| def.serial_column())
        .ok_or_else(|| {
            MigrateError::contract(
                entity.name(),
                format!("{} cannot be remapped through {}", remap.column, remap.target),
            )
        })?;
    let t = entity.table();
    let col = remap.column;
    let fallback = match remap.on_orphan {
        OnOrphan::Zero => "0".to_string(),
        OnOrphan::Delete => format!("::{}.{}", t, col),
    };
    Ok(Statement::new(
        format!(
            "UPDATE ::{t} SET {col} = COALESCE((SELECT r.{key} FROM ::{target} r \
             WHERE r.id_old = -::{t}.{col}), {fallback}) WHERE {col} < 0",
            t = t,
            col = col,
            key = key,
            target = remap.target.table(),
            fallback = fallback
        ),
        Vec::new(),
    ))
}

fn orphans(entity: Entity, remap: &Remap) -> Statement {
    let sql = match remap.on_orphan {
        OnOrphan::Zero => format!(
            "UPDATE ::{t} SET {col} = 0 WHERE {col} < 0",
            t = entity.table(),
            col = remap.column
        ),
        OnOrphan::Delete => format!(
            "DELETE FROM ::{t} WHERE {col} < 0",
            t = entity.table(),
            col = remap.column
        ),
    };
    Statement::new(sql, Vec::new())
}
