//! Merging archived rows back into source tables, and guarded shadow drops.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::{SchemaIntrospector, SqliteIntrospector};
use crate::error::{Error, Result};
use crate::mover::identifier_column;
use crate::shadow::{is_shadow, shadow_name, Dialect};

/// Restores archived data and destroys shadow tables under a naming guard.
pub struct RestoreManager<'c> {
    conn: &'c Connection,
    dialect: Dialect,
}

impl<'c> RestoreManager<'c> {
    /// Manage restores over an open connection.
    pub fn new(conn: &'c Connection, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    /// Merge the shadow of `source` back into it, then drop the shadow.
    ///
    /// Identifiers already present in the source are skipped, so a partially
    /// restored table can be restored again without duplication. Constraint
    /// enforcement is suspended around the merge and restored even on error.
    pub fn restore(&self, source: &str) -> Result<()> {
        let wrap = |e: rusqlite::Error| Error::Restore {
            table: source.to_string(),
            source: e,
        };

        let shadow = shadow_name(source);
        let intro = SqliteIntrospector::new(self.conn);
        if !intro.table_exists(&shadow)? {
            return Err(Error::MissingShadow(source.to_string()));
        }

        let id_column = identifier_column(&intro, source)?;
        // Merge only columns both sides know; the shadow may trail the
        // source if the source gained columns since the last sync.
        let shadow_columns = intro.columns(&shadow)?;
        let column_list = intro
            .columns(source)?
            .iter()
            .filter(|c| shadow_columns.iter().any(|s| s.name == c.name))
            .map(|c| self.dialect.quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        self.conn
            .execute_batch(self.dialect.suspend_constraints_sql())
            .map_err(wrap)?;
        let merged = self.merge(source, &shadow, &id_column, &column_list);
        if let Err(e) = self
            .conn
            .execute_batch(self.dialect.restore_constraints_sql())
        {
            warn!(table = %source, error = %e, "failed to restore constraint enforcement");
        }
        let restored = merged.map_err(wrap)?;

        info!(table = %source, rows = restored, "restored archived rows");
        self.drop_shadow(&shadow)
    }

    fn merge(
        &self,
        source: &str,
        shadow: &str,
        id_column: &str,
        column_list: &str,
    ) -> rusqlite::Result<usize> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            let sql = format!(
                "INSERT INTO {source} ({columns}) \
                 SELECT {columns} FROM {shadow} a \
                 WHERE NOT EXISTS (SELECT 1 FROM {source} s WHERE s.{id} = a.{id})",
                source = self.dialect.quote(source),
                shadow = self.dialect.quote(shadow),
                columns = column_list,
                id = self.dialect.quote(id_column),
            );
            let merged = self.conn.execute(&sql, [])?;
            self.conn.execute("COMMIT", [])?;
            Ok(merged)
        })();
        if result.is_err() {
            if let Err(e) = self.conn.execute("ROLLBACK", []) {
                warn!(table = %source, error = %e, "rollback after failed restore also failed");
            }
        }
        result
    }

    /// Drop a shadow table.
    ///
    /// Hard guard: refuses any name without the reserved prefix, so live
    /// source tables can never be destroyed through this code path.
    pub fn drop_shadow(&self, table: &str) -> Result<()> {
        if !is_shadow(table) {
            warn!(table = %table, "refusing to drop table without shadow prefix");
            return Err(Error::GuardRejection(table.to_string()));
        }
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}",
            self.dialect.quote(table)
        ))?;
        Ok(())
    }
}
