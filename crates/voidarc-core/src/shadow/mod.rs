//! Shadow ("archive") table lifecycle: creation and schema sync.

mod dialect;

pub use dialect::Dialect;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::catalog::{SchemaIntrospector, SqliteIntrospector};
use crate::error::{Error, Result};

/// Reserved prefix marking shadow tables.
///
/// The prefix convention IS the persisted archival state: no separate
/// metadata store exists, and every destructive code path must check it.
pub const SHADOW_PREFIX: &str = "archive_";

/// True when the name carries the reserved shadow prefix.
pub fn is_shadow(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with(SHADOW_PREFIX)
}

/// Shadow table name for a source table.
pub fn shadow_name(source: &str) -> String {
    format!("{SHADOW_PREFIX}{source}")
}

/// Creates shadow tables and keeps their columns in sync with the source.
pub struct ShadowTables<'c> {
    conn: &'c Connection,
    dialect: Dialect,
}

impl<'c> ShadowTables<'c> {
    /// Manage shadow tables over an open connection.
    pub fn new(conn: &'c Connection, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    /// Ensure `source` has a shadow table matching its current columns.
    ///
    /// Creates an empty structural copy when missing; otherwise adds any
    /// column present in the source but absent from the shadow, carrying the
    /// reported type best-effort. Idempotent on an unchanged source.
    pub fn ensure_shadow(&self, source: &str) -> Result<()> {
        let shadow = shadow_name(source);
        let intro = SqliteIntrospector::new(self.conn);

        if !intro.table_exists(&shadow)? {
            let sql = self.dialect.create_shadow_sql(&shadow, source);
            self.conn
                .execute_batch(&sql)
                .map_err(|e| Error::ShadowCreation {
                    table: source.to_string(),
                    source: e,
                })?;
            debug!(source = %source, shadow = %shadow, "created shadow table");
            return Ok(());
        }

        self.sync_columns(&intro, source, &shadow)
    }

    /// Add source columns the shadow is missing, logging past single-column
    /// failures so one bad type never aborts the whole sync.
    fn sync_columns(
        &self,
        intro: &SqliteIntrospector<'_>,
        source: &str,
        shadow: &str,
    ) -> Result<()> {
        let source_columns = intro.columns(source)?;
        let shadow_columns = intro.columns(shadow)?;

        for column in &source_columns {
            if shadow_columns.iter().any(|c| c.name == column.name) {
                continue;
            }
            let sql = self
                .dialect
                .add_column_sql(shadow, &column.name, &column.declared_type);
            match self.conn.execute_batch(&sql) {
                Ok(()) => debug!(shadow = %shadow, column = %column.name, "added shadow column"),
                Err(e) => warn!(
                    shadow = %shadow,
                    column = %column.name,
                    error = %e,
                    "failed to sync shadow column"
                ),
            }
        }

        Ok(())
    }
}
