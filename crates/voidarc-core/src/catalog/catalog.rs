//! Read-only catalog queries over the live schema.

use rusqlite::Connection;
use tracing::warn;

use super::{
    is_internal, ColumnInfo, SchemaIntrospector, SqliteIntrospector, TableDescriptor, VoidedEntry,
    SAMPLE_LIMIT, VOID_FLAG_COLUMN,
};
use crate::error::Result;
use crate::shadow::is_shadow;

/// Quote an identifier discovered from the live schema for use in SQL text.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Catalog of the active schema.
///
/// Every query runs against the live connection; nothing is cached or
/// persisted between calls.
pub struct SchemaCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SchemaCatalog<'c> {
    /// Wrap an open connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Describe every ordinary table in the active schema.
    ///
    /// Internal bookkeeping tables and shadow tables are skipped. A failure
    /// while counting or sampling one table degrades that table's descriptor
    /// instead of failing the listing.
    pub fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let intro = SqliteIntrospector::new(self.conn);
        let mut descriptors = Vec::new();

        for name in intro.table_names()? {
            if is_internal(&name) || is_shadow(&name) {
                continue;
            }
            descriptors.push(self.describe(&intro, &name));
        }

        Ok(descriptors)
    }

    /// Describe every non-empty shadow table, counts populated.
    pub fn list_shadow_tables(&self) -> Result<Vec<TableDescriptor>> {
        let intro = SqliteIntrospector::new(self.conn);
        let mut descriptors = Vec::new();

        for name in intro.table_names()? {
            if !is_shadow(&name) {
                continue;
            }
            let total = match self.count_rows(&name, false) {
                Ok(count) => count,
                Err(e) => {
                    warn!(table = %name, error = %e, "failed to count archived rows");
                    continue;
                }
            };
            if total == 0 {
                continue;
            }

            let mut desc = TableDescriptor::new(name.clone(), true);
            desc.total_records = Some(total);
            // Every archived row was voided at archival time.
            desc.voided_records = Some(total);
            desc.voided_entries = self.sample_entries(&intro, &name).unwrap_or_else(|e| {
                warn!(table = %name, error = %e, "failed to sample archived rows");
                Vec::new()
            });
            descriptors.push(desc);
        }

        Ok(descriptors)
    }

    /// Names of all voidable, non-shadow, non-internal tables.
    ///
    /// Cheaper than [`SchemaCatalog::list_tables`]: no counts, no samples.
    pub fn voidable_tables(&self) -> Result<Vec<String>> {
        let intro = SqliteIntrospector::new(self.conn);
        let mut names = Vec::new();

        for name in intro.table_names()? {
            if is_internal(&name) || is_shadow(&name) {
                continue;
            }
            match intro.has_column(&name, VOID_FLAG_COLUMN) {
                Ok(true) => names.push(name),
                Ok(false) => {}
                Err(e) => warn!(table = %name, error = %e, "skipping table in voidable scan"),
            }
        }

        Ok(names)
    }

    /// Build one table's descriptor, isolating every per-table failure.
    fn describe(&self, intro: &SqliteIntrospector<'_>, name: &str) -> TableDescriptor {
        let is_voidable = match intro.has_column(name, VOID_FLAG_COLUMN) {
            Ok(voidable) => voidable,
            Err(e) => {
                warn!(table = %name, error = %e, "failed to inspect columns");
                false
            }
        };
        let mut desc = TableDescriptor::new(name, is_voidable);
        if !is_voidable {
            desc.voided_records = Some(0);
            return desc;
        }

        match self.count_rows(name, false) {
            Ok(count) => desc.total_records = Some(count),
            Err(e) => warn!(table = %name, error = %e, "failed to count rows"),
        }
        match self.count_rows(name, true) {
            Ok(count) => desc.voided_records = Some(count),
            Err(e) => {
                warn!(table = %name, error = %e, "failed to count voided rows");
                desc.voided_records = Some(0);
            }
        }

        if desc.voided_records.unwrap_or(0) > 0 {
            desc.voided_entries = self.sample_entries(intro, name).unwrap_or_else(|e| {
                warn!(table = %name, error = %e, "failed to sample voided rows");
                Vec::new()
            });
        }

        desc
    }

    fn count_rows(&self, table: &str, voided_only: bool) -> Result<u64> {
        let mut sql = format!("SELECT count(*) FROM {}", quote_ident(table));
        if voided_only {
            sql.push_str(&format!(" WHERE {VOID_FLAG_COLUMN} = 1"));
        }
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Fetch up to [`SAMPLE_LIMIT`] voided rows, newest first when orderable.
    ///
    /// Optional columns absent from the table are replaced with literal
    /// placeholders so the query never fails on schema variation.
    fn sample_entries(
        &self,
        intro: &SqliteIntrospector<'_>,
        table: &str,
    ) -> Result<Vec<VoidedEntry>> {
        let columns = intro.columns(table)?;
        let has = |name: &str| columns.iter().any(|c: &ColumnInfo| c.name == name);

        let has_uuid = has("uuid");
        let has_voided_by = has("voided_by");
        let has_date_voided = has("date_voided");
        let has_void_reason = has("void_reason");
        let join_users = has_voided_by
            && intro.table_exists("users")?
            && intro.has_column("users", "user_id")?
            && intro.has_column("users", "username")?;

        let mut select = Vec::with_capacity(5);
        select.push(if has_uuid { "t.uuid" } else { "'' AS uuid" });
        select.push(if has_voided_by {
            "t.voided_by"
        } else {
            "NULL AS voided_by"
        });
        select.push(if join_users {
            "u.username"
        } else {
            "NULL AS username"
        });
        select.push(if has_date_voided {
            "t.date_voided"
        } else {
            "NULL AS date_voided"
        });
        select.push(if has_void_reason {
            "t.void_reason"
        } else {
            "'' AS void_reason"
        });

        let mut sql = format!(
            "SELECT {} FROM {} t",
            select.join(", "),
            quote_ident(table)
        );
        if join_users {
            // Left join keeps entries whose voiding user no longer exists.
            sql.push_str(" LEFT JOIN users u ON t.voided_by = u.user_id");
        }
        sql.push_str(&format!(" WHERE t.{VOID_FLAG_COLUMN} = 1"));
        if has_date_voided {
            sql.push_str(" ORDER BY t.date_voided DESC");
        }
        sql.push_str(&format!(" LIMIT {SAMPLE_LIMIT}"));

        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], |row| {
                let record_id: Option<String> = row.get(0)?;
                let voided_by_id: Option<i64> = row.get(1)?;
                let username: Option<String> = row.get(2)?;
                let voided_at: Option<String> = row.get(3)?;
                let void_reason: Option<String> = row.get(4)?;

                let voided_by = match (username, voided_by_id) {
                    (Some(name), _) if !name.is_empty() => name,
                    (_, Some(id)) => format!("User #{id}"),
                    _ => String::new(),
                };

                Ok(VoidedEntry {
                    record_id: record_id.unwrap_or_default(),
                    voided_by,
                    voided_at,
                    void_reason,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

}
