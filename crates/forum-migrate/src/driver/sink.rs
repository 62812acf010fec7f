//! Destination writers.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::handler::RowSink;
use crate::core::{Row, Value};
use crate::db::Statement;
use crate::dialect::Dialect;
use crate::entity::{Entity, WritePolicy};
use crate::error::{MigrateError, Result};
use crate::orchestrator::MigrationContext;
use crate::remap::{
    mark_pending, next_email, next_username, normalize_email, normalize_username,
    MAX_SUFFIX_ATTEMPTS,
};
use crate::schema::{table, TableDef, ID_OLD};

/// Writes rows of one entity according to its write policy.
pub struct TableSink {
    entity: Entity,
}

impl TableSink {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }

    fn def(&self) -> Result<&'static TableDef> {
        table(self.entity.table()).ok_or_else(|| {
            MigrateError::contract(self.entity.name(), "no destination table definition")
        })
    }

    /// Shape a translated row for writing: column defaults, pending
    /// references (or preserved ids), merge offsets, renamed usernames,
    /// normalized lookup columns and `id_old`.
    pub fn prepare(&self, ctx: &MigrationContext, row: &Row) -> Result<Row> {
        let def = self.def()?;
        let mut out = def.conform(row);
        let id_old = row.id_old();

        if ctx.mode.preserves_ids() {
            if let Some(serial) = def.serial_column() {
                if id_old > 0 {
                    out.set(serial, id_old);
                }
            }
        } else {
            mark_pending(&mut out, self.entity.remaps());
        }

        if let Some(column) = self.entity.position_column() {
            if let Some(offset) = ctx.offsets.get(self.entity.name()) {
                out.set(column, out.int(column) + offset);
            }
        }

        ctx.renames.rewrite(&mut out, self.entity.username_columns());

        if def.column("username_normal").is_some() {
            out.set("username_normal", normalize_username(&out.text("username")));
        }
        if def.column("email_normal").is_some() {
            out.set("email_normal", normalize_email(&out.text("email")));
        }

        if self.entity.tracks_id_old() {
            out.set(ID_OLD, id_old);
        }
        Ok(out)
    }

    async fn insert(&self, ctx: &mut MigrationContext, row: Row) -> Result<()> {
        if self.def()?.column("username_normal").is_some() {
            return self.insert_resolving_collisions(ctx, row).await;
        }
        let stmt = Statement::insert(ctx.dest.dialect(), self.entity.table(), &row);
        ctx.dest.execute(&stmt.sql, &stmt.params).await?;
        Ok(())
    }

    /// Insert a user, renaming on username or email collisions.
    async fn insert_resolving_collisions(
        &self,
        ctx: &mut MigrationContext,
        mut row: Row,
    ) -> Result<()> {
        let original_name = row.text("username");
        let original_email = row.text("email");
        let mut column = "username";

        for _ in 0..MAX_SUFFIX_ATTEMPTS {
            let stmt = Statement::insert(ctx.dest.dialect(), self.entity.table(), &row);
            match ctx.dest.execute(&stmt.sql, &stmt.params).await {
                Ok(_) => {
                    let name = row.text("username");
                    if name != original_name {
                        warn!(
                            "User {:?} renamed to {:?} (username collision)",
                            original_name, name
                        );
                        ctx.renames.record(original_name, name);
                    }
                    let email = row.text("email");
                    if email != original_email {
                        warn!(
                            "Email of user {:?} changed from {:?} to {:?} (email collision)",
                            row.text("username"),
                            original_email,
                            email
                        );
                        ctx.emails.record(original_email, email);
                    }
                    return Ok(());
                }
                Err(e) if e.is_unique_violation_on("username") => {
                    column = "username";
                    let next = next_username(&row.text("username"));
                    debug!("Username {:?} taken, trying {:?}", row.text("username"), next);
                    row.set("username_normal", normalize_username(&next));
                    row.set("username", next);
                }
                Err(e) if e.is_unique_violation_on("email") => {
                    column = "email";
                    let next = next_email(&row.text("email"));
                    debug!("Email {:?} taken, trying {:?}", row.text("email"), next);
                    row.set("email_normal", normalize_email(&next));
                    row.set("email", next);
                }
                Err(e) => return Err(e),
            }
        }

        Err(MigrateError::CollisionLimit {
            column: column.to_string(),
            value: if column == "email" {
                original_email
            } else {
                original_name
            },
            attempts: MAX_SUFFIX_ATTEMPTS,
        })
    }

    /// Update a seeded row in place. Merge mode only links it to its
    /// source row.
    async fn update_reserved(
        &self,
        ctx: &MigrationContext,
        serial: &str,
        id: i64,
        row: Row,
    ) -> Result<()> {
        let dialect = ctx.dest.dialect();
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (column, value) in row.iter() {
            if column == serial || (ctx.mode.is_merge() && column != ID_OLD) {
                continue;
            }
            assignments.push(format!("{} = ?", dialect.quote_ident(column)));
            params.push(value.clone());
        }
        params.push(Value::from(id));
        let sql = format!(
            "UPDATE ::{} SET {} WHERE {} = ?",
            self.entity.table(),
            assignments.join(", "),
            dialect.quote_ident(serial)
        );
        ctx.dest.execute(&sql, &params).await?;
        Ok(())
    }
}

#[async_trait]
impl RowSink for TableSink {
    async fn purge(&self, ctx: &MigrationContext, cursor: i64) -> Result<u64> {
        let mut sql = format!("DELETE FROM ::{} WHERE id_old >= ?", self.entity.table());
        match self.entity.write_policy() {
            WritePolicy::Insert => {}
            WritePolicy::Reserved(ids) => {
                let serial = self.def()?.serial_column().ok_or_else(|| {
                    MigrateError::contract(self.entity.name(), "reserved rows need a serial key")
                })?;
                let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
                sql.push_str(&format!(" AND {} NOT IN ({})", serial, ids.join(", ")));
            }
            _ => return Ok(0),
        }
        let purged = ctx.dest.execute(&sql, &[Value::from(cursor.max(1))]).await?;
        if purged > 0 {
            warn!(
                "{}: removed {} rows left by an interrupted batch",
                self.entity, purged
            );
        }
        Ok(purged)
    }

    async fn write(&self, ctx: &mut MigrationContext, row: Row) -> Result<()> {
        match self.entity.write_policy() {
            WritePolicy::Insert => {
                let prepared = self.prepare(ctx, &row)?;
                self.insert(ctx, prepared).await
            }
            WritePolicy::Reserved(ids) => {
                let serial = self.def()?.serial_column().ok_or_else(|| {
                    MigrateError::contract(self.entity.name(), "reserved rows need a serial key")
                })?;
                let target = row.get(serial).and_then(Value::as_i64);
                let prepared = self.prepare(ctx, &row)?;
                match target {
                    Some(id) if ids.contains(&id) => {
                        self.update_reserved(ctx, serial, id, prepared).await
                    }
                    _ => self.insert(ctx, prepared).await,
                }
            }
            WritePolicy::Upsert(key) => {
                let prepared = self.prepare(ctx, &row)?;
                let stmt = Statement::upsert(
                    ctx.dest.dialect(),
                    self.entity.table(),
                    &prepared,
                    key,
                );
                ctx.dest.execute(&stmt.sql, &stmt.params).await?;
                Ok(())
            }
            WritePolicy::InsertIgnore => {
                let prepared = self.prepare(ctx, &row)?;
                let stmt =
                    Statement::insert_ignore(ctx.dest.dialect(), self.entity.table(), &prepared);
                ctx.dest.execute(&stmt.sql, &stmt.params).await?;
                Ok(())
            }
            WritePolicy::None => Ok(()),
        }
    }
}

/// Discards rows.
pub struct NullSink;

#[async_trait]
impl RowSink for NullSink {
    async fn write(&self, _ctx: &mut MigrationContext, _row: Row) -> Result<()> {
        Ok(())
    }
}
