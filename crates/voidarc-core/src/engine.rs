//! The archival engine facade.
//!
//! Owns the connection for the duration of a run and drives the catalog,
//! planner, shadow manager, and mover in dependency-safe order.

use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::catalog::{SchemaCatalog, SchemaIntrospector, SqliteIntrospector, TableDescriptor, VOID_FLAG_COLUMN};
use crate::error::Result;
use crate::graph::{build_dependency_graph, DependencyGraph};
use crate::mover::BatchMover;
use crate::plan::ArchivalPlanner;
use crate::restore::RestoreManager;
use crate::shadow::{is_shadow, Dialect, ShadowTables};

/// Default number of rows relocated per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Outcome of one table inside an archival run.
#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    /// Source table name.
    pub table: String,
    /// Rows moved into the shadow table.
    pub rows_moved: u64,
    /// Error message when this table's archival aborted.
    pub error: Option<String>,
}

/// Aggregate report for one archival run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchivalReport {
    /// Per-table outcomes in processing order.
    pub tables: Vec<TableOutcome>,
    /// Whether the planner fell back to a partial order.
    pub partial_order: bool,
}

impl ArchivalReport {
    /// Total rows moved across all tables.
    pub fn rows_moved(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_moved).sum()
    }

    /// Tables whose archival aborted.
    pub fn failures(&self) -> Vec<&TableOutcome> {
        self.tables.iter().filter(|t| t.error.is_some()).collect()
    }
}

/// Archives soft-deleted rows into shadow tables and restores them back.
///
/// The engine holds its connection exclusively, so the constraint-suspension
/// toggle issued during batches can never leak into another session. Runs
/// are strictly sequential: each table's batches drain fully before the next
/// table starts.
pub struct ArchiveEngine {
    conn: Connection,
    dialect: Dialect,
    batch_size: usize,
}

impl ArchiveEngine {
    /// Wrap an open connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            dialect: Dialect::Sqlite,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Open a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Override the per-transaction batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Describe every ordinary table, with voided counts and samples.
    pub fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        SchemaCatalog::new(&self.conn).list_tables()
    }

    /// Describe every non-empty shadow table.
    pub fn list_shadow_tables(&self) -> Result<Vec<TableDescriptor>> {
        SchemaCatalog::new(&self.conn).list_shadow_tables()
    }

    /// The child-to-parents foreign-key graph.
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        let intro = SqliteIntrospector::new(&self.conn);
        build_dependency_graph(&intro)
    }

    /// Archive voided rows for `target` and every table referencing it, or
    /// for all voidable tables when no target is given.
    ///
    /// Tables are processed strictly in planner order, children before
    /// parents. A failure in one table is recorded in the report and the run
    /// continues with the remaining tables.
    pub fn run_archival(&self, target: Option<&str>) -> Result<ArchivalReport> {
        let graph = self.dependency_graph()?;
        let voidable = SchemaCatalog::new(&self.conn).voidable_tables()?;
        let planner = ArchivalPlanner::new(&graph);
        let order = planner.plan(target, &voidable)?;

        info!(order = ?order.tables(), "archival order");

        let mut report = ArchivalReport {
            partial_order: order.is_partial(),
            ..Default::default()
        };
        for table in order.into_tables() {
            if is_shadow(&table) {
                continue;
            }
            match self.archive_table(&table) {
                Ok(rows_moved) => {
                    if rows_moved > 0 {
                        info!(table = %table, rows = rows_moved, "archived voided rows");
                    }
                    report.tables.push(TableOutcome {
                        table,
                        rows_moved,
                        error: None,
                    });
                }
                Err(e) => {
                    // A failed child may later starve its parents; that is
                    // accepted best-effort behavior.
                    error!(table = %table, error = %e, "archival failed for table");
                    report.tables.push(TableOutcome {
                        table,
                        rows_moved: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Merge archived rows for `source` back and drop its shadow table.
    pub fn restore(&self, source: &str) -> Result<()> {
        RestoreManager::new(&self.conn, self.dialect).restore(source)
    }

    /// Drop a shadow table, refusing names without the reserved prefix.
    pub fn drop_shadow(&self, table: &str) -> Result<()> {
        RestoreManager::new(&self.conn, self.dialect).drop_shadow(table)
    }

    /// Ensure the shadow exists, then drain the batch loop for one table.
    fn archive_table(&self, table: &str) -> Result<u64> {
        let intro = SqliteIntrospector::new(&self.conn);
        if !intro.has_column(table, VOID_FLAG_COLUMN)? {
            // Non-voidable dependents ride along for ordering only.
            debug!(table = %table, "table has no void marker, nothing to archive");
            return Ok(0);
        }

        ShadowTables::new(&self.conn, self.dialect).ensure_shadow(table)?;

        let mover = BatchMover::new(&self.conn, self.dialect);
        let mut total = 0u64;
        loop {
            let moved = mover.move_batch(table, self.batch_size)?;
            if moved == 0 {
                break;
            }
            total += moved as u64;
        }
        Ok(total)
    }
}
