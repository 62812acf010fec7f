//! Destination schema creation and `id_old` tracking columns.

use tracing::{debug, info, warn};

use super::{seed, TableDef, ID_OLD, TABLES};
use crate::core::{Row, Value};
use crate::db::{Database, Statement};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// Index suffix of the tracking column.
const ID_OLD_INDEX: &str = "id_old_idx";

/// Creates and evolves the destination schema.
pub struct SchemaEvolver<'a> {
    dest: &'a dyn Database,
    seed_content: bool,
}

impl<'a> SchemaEvolver<'a> {
    pub fn new(dest: &'a dyn Database) -> Self {
        Self {
            dest,
            seed_content: true,
        }
    }

    /// Whether [`create_destination_schema`](Self::create_destination_schema)
    /// seeds the default smilies and bbcode. Disabled when the source rows
    /// are copied with their ids, so only the source's own rows end up in
    /// those tables.
    pub fn seed_content(mut self, enabled: bool) -> Self {
        self.seed_content = enabled;
        self
    }

    /// Create every destination table and seed the baseline rows.
    ///
    /// `users` is created last, together with the guest account, so a run
    /// interrupted half way through can repeat this call: existing tables
    /// are kept and seed rows are inserted only when missing. Once `users`
    /// exists the destination counts as populated.
    pub async fn create_destination_schema(&self) -> Result<()> {
        if self.dest.table_exists("users").await? {
            return Err(MigrateError::DestinationNotEmpty {
                table: self.dest.physical("users"),
            });
        }

        info!("Creating destination schema ({} tables)", TABLES.len());

        for def in TABLES.iter().filter(|t| t.name != "users") {
            if self.dest.table_exists(def.name).await? {
                debug!("Table {} already exists, keeping it", def.name);
            } else {
                self.dest
                    .execute_batch(&self.create_statements(def))
                    .await?;
            }
        }

        self.seed().await?;

        let users = super::table("users").ok_or_else(|| {
            MigrateError::contract("users", "missing from destination catalogue")
        })?;
        let mut statements = self.create_statements(users);
        statements.push(Statement::insert(
            self.dest.dialect(),
            "users",
            &seed::guest_user(),
        ));
        self.dest.execute_batch(&statements).await?;
        self.reset_sequence("users").await?;

        info!("Destination schema created");
        Ok(())
    }

    fn create_statements(&self, def: &TableDef) -> Vec<Statement> {
        let dialect = self.dest.dialect();
        let table = self.dest.table(def.name);

        let mut statements = vec![Statement::new(
            dialect.create_table_sql(&table, def),
            Vec::new(),
        )];
        for index in def.indexes {
            statements.push(Statement::new(
                dialect.create_index_sql(
                    &table,
                    &self.dest.index_name(def.name, index.name),
                    index,
                ),
                Vec::new(),
            ));
        }
        statements
    }

    async fn seed(&self) -> Result<()> {
        let dialect = self.dest.dialect();
        let mut statements = Vec::new();

        for row in seed::groups() {
            statements.push(Statement::insert_ignore(dialect, "groups", &row));
        }
        if self.seed_content {
            for row in seed::smilies() {
                statements.push(Statement::insert_ignore(dialect, "smilies", &row));
            }
            for row in seed::bbcode() {
                statements.push(Statement::insert_ignore(dialect, "bbcode", &row));
            }
        } else {
            debug!("Skipping default smilies and bbcode");
        }
        for (name, value) in seed::config() {
            let row = Row::new().with("conf_name", name).with("conf_value", value);
            statements.push(Statement::insert_ignore(dialect, "config", &row));
        }

        let inserted = self.dest.execute_batch(&statements).await?;
        debug!("Seeded {} baseline rows", inserted);

        self.reset_sequence("groups").await
    }

    /// Re-align the sequence of a serial table after explicit ids were
    /// inserted. No-op on dialects that track this themselves.
    pub async fn reset_sequence(&self, table: &str) -> Result<()> {
        let Some(def) = super::table(table) else {
            return Ok(());
        };
        let Some(serial) = def.serial_column() else {
            return Ok(());
        };
        if let Some(sql) = self
            .dest
            .dialect()
            .reset_sequence_sql(&self.dest.table(table), serial)
        {
            self.dest.execute(&sql, &[]).await?;
        }
        Ok(())
    }

    /// Add `id_old` and its index to each table that lacks them.
    ///
    /// Fails before changing anything when an existing `id_old` column
    /// already holds non-zero values.
    pub async fn add_tracking_columns(&self, tables: &[&str]) -> Result<()> {
        for table in tables {
            if self.dest.column_exists(table, ID_OLD).await? {
                let populated = self
                    .dest
                    .query_int(
                        &format!("SELECT COUNT(*) AS n FROM ::{} WHERE id_old <> 0", table),
                        &[],
                    )
                    .await?;
                if populated > 0 {
                    return Err(MigrateError::TrackingColumnPopulated {
                        table: self.dest.physical(table),
                    });
                }
            }
        }

        let dialect = self.dest.dialect();
        for table in tables {
            let physical = self.dest.table(table);
            if !self.dest.column_exists(table, ID_OLD).await? {
                self.dest
                    .execute(&dialect.add_int_column_sql(&physical, ID_OLD), &[])
                    .await?;
            }
            if !self.dest.index_exists(table, ID_OLD_INDEX).await? {
                let index = super::IndexDef {
                    name: ID_OLD_INDEX,
                    columns: &[ID_OLD],
                    unique: false,
                };
                self.dest
                    .execute(
                        &dialect.create_index_sql(
                            &physical,
                            &self.dest.index_name(table, ID_OLD_INDEX),
                            &index,
                        ),
                        &[],
                    )
                    .await?;
            }
        }

        info!("Tracking columns ready on {} tables", tables.len());
        Ok(())
    }

    /// Drop `id_old` and its index wherever present.
    pub async fn drop_tracking_columns(&self, tables: &[&str]) -> Result<()> {
        let dialect = self.dest.dialect();
        for table in tables {
            if !self.dest.table_exists(table).await? {
                warn!("Table {} vanished before cleanup", table);
                continue;
            }
            let physical = self.dest.table(table);
            if self.dest.index_exists(table, ID_OLD_INDEX).await? {
                self.dest
                    .execute(
                        &dialect.drop_index_sql(&physical, &self.dest.index_name(table, ID_OLD_INDEX)),
                        &[],
                    )
                    .await?;
            }
            if self.dest.column_exists(table, ID_OLD).await? {
                self.dest
                    .execute(&dialect.drop_column_sql(&physical, ID_OLD), &[])
                    .await?;
            }
        }

        info!("Tracking columns dropped from {} tables", tables.len());
        Ok(())
    }

    /// Whether `id_old` is present on `table`.
    pub async fn has_tracking_column(&self, table: &str) -> Result<bool> {
        self.dest.column_exists(table, ID_OLD).await
    }
}

/// Whether the destination has a populated forum (a `users` table).
pub async fn destination_populated(dest: &dyn Database) -> Result<bool> {
    dest.table_exists("users").await
}

/// The configured revision of a destination, if it has a config table.
pub async fn destination_revision(dest: &dyn Database) -> Result<Option<i64>> {
    if !dest.table_exists("config").await? {
        return Ok(None);
    }
    let row = dest
        .query_one(
            "SELECT conf_value FROM ::config WHERE conf_name = ?",
            &[Value::from("i_fork_revision")],
        )
        .await?;
    Ok(row.and_then(|r| r.get("conf_value").and_then(Value::as_i64)))
}
