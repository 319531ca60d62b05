//! voidarc core - archival engine for soft-deleted relational data.
//!
//! Moves voided rows out of live tables into `archive_`-prefixed shadow
//! tables in dependency-safe order, and merges them back on restore. The
//! schema is discovered at run time; nothing here carries compile-time
//! knowledge of table shapes.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod graph;
pub mod mover;
pub mod plan;
pub mod restore;
pub mod shadow;

pub use catalog::{
    ColumnInfo, ForeignKey, SchemaCatalog, SchemaIntrospector, SqliteIntrospector,
    TableDescriptor, VoidedEntry, SAMPLE_LIMIT, VOID_FLAG_COLUMN,
};
pub use engine::{ArchivalReport, ArchiveEngine, TableOutcome, DEFAULT_BATCH_SIZE};
pub use error::{Error, Result};
pub use graph::{build_dependency_graph, DependencyGraph};
pub use mover::{identifier_column, BatchMover};
pub use plan::{ArchivalPlanner, TopoOrder};
pub use restore::RestoreManager;
pub use shadow::{is_shadow, shadow_name, Dialect, ShadowTables, SHADOW_PREFIX};
