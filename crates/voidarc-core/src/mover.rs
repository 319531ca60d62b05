//! Batched, transactional relocation of voided rows into shadow tables.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::warn;

use crate::catalog::{SchemaIntrospector, SqliteIntrospector, VOID_FLAG_COLUMN};
use crate::error::{Error, Result};
use crate::shadow::{shadow_name, Dialect};

/// Resolve the identifier column used to slice and address rows.
///
/// Declared primary key first, then the conventional `<table>_id`, then a
/// bare `id` column.
pub fn identifier_column(intro: &dyn SchemaIntrospector, table: &str) -> Result<String> {
    if let Some(pk) = intro.primary_key(table)? {
        return Ok(pk);
    }
    let conventional = format!("{table}_id");
    if intro.has_column(table, &conventional)? {
        return Ok(conventional);
    }
    if intro.has_column(table, "id")? {
        return Ok("id".to_string());
    }
    Err(Error::NoIdentifier(table.to_string()))
}

/// Moves voided rows from a source table into its shadow, one bounded
/// transaction per batch.
pub struct BatchMover<'c> {
    conn: &'c Connection,
    dialect: Dialect,
}

impl<'c> BatchMover<'c> {
    /// Move batches over an open connection.
    pub fn new(conn: &'c Connection, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    /// Move up to `batch_size` voided rows from `source` into its shadow.
    ///
    /// Returns the number of identifiers moved; 0 signals the drain loop to
    /// stop. The insert-plus-delete runs as one transaction with
    /// referential-integrity enforcement suspended, and enforcement is
    /// restored best-effort on every exit path. On failure the whole batch
    /// rolls back; nothing is ever left half-applied.
    pub fn move_batch(&self, source: &str, batch_size: usize) -> Result<usize> {
        let wrap = |e: rusqlite::Error| Error::BatchMove {
            table: source.to_string(),
            source: e,
        };

        let intro = SqliteIntrospector::new(self.conn);
        let id_column = identifier_column(&intro, source)?;
        let shadow = shadow_name(source);

        // Descending identifier order: a stable, deterministic slice that
        // tends toward newest-inserted rows first.
        let select_sql = format!(
            "SELECT {id} FROM {table} WHERE {VOID_FLAG_COLUMN} = 1 ORDER BY {id} DESC LIMIT {limit}",
            id = self.dialect.quote(&id_column),
            table = self.dialect.quote(source),
            limit = batch_size
        );
        let mut stmt = self.conn.prepare(&select_sql).map_err(wrap)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, Value>(0))
            .map_err(wrap)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(wrap)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let column_list = intro
            .columns(source)?
            .iter()
            .map(|c| self.dialect.quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        // SQLite ignores the foreign_keys pragma while a transaction is
        // open, so the toggle brackets the transaction.
        self.conn
            .execute_batch(self.dialect.suspend_constraints_sql())
            .map_err(wrap)?;
        let transferred = self.transfer(source, &shadow, &id_column, &column_list, &placeholders, &ids);
        if let Err(e) = self
            .conn
            .execute_batch(self.dialect.restore_constraints_sql())
        {
            warn!(table = %source, error = %e, "failed to restore constraint enforcement");
        }
        transferred.map_err(wrap)?;

        Ok(ids.len())
    }

    /// One atomic insert-into-shadow plus delete-from-source unit.
    fn transfer(
        &self,
        source: &str,
        shadow: &str,
        id_column: &str,
        column_list: &str,
        placeholders: &str,
        ids: &[Value],
    ) -> rusqlite::Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;

        let result = (|| {
            // Conflict-skip tolerates leftovers from an earlier partially
            // failed attempt.
            let insert_sql = format!(
                "{verb} INTO {shadow} ({columns}) SELECT {columns} FROM {source} WHERE {id} IN ({placeholders})",
                verb = self.dialect.insert_ignore(),
                shadow = self.dialect.quote(shadow),
                columns = column_list,
                source = self.dialect.quote(source),
                id = self.dialect.quote(id_column),
            );
            self.conn
                .execute(&insert_sql, params_from_iter(ids.iter()))?;

            let delete_sql = format!(
                "DELETE FROM {source} WHERE {id} IN ({placeholders})",
                source = self.dialect.quote(source),
                id = self.dialect.quote(id_column),
            );
            self.conn
                .execute(&delete_sql, params_from_iter(ids.iter()))?;

            self.conn.execute("COMMIT", [])
        })();

        if result.is_err() {
            if let Err(e) = self.conn.execute("ROLLBACK", []) {
                warn!(table = %source, error = %e, "rollback after failed batch also failed");
            }
        }
        result.map(|_| ())
    }
}
