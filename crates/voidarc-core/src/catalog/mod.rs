//! Schema catalog: live structural metadata and per-table voided-data summaries.

mod catalog;
mod descriptor;
mod introspect;

pub use catalog::SchemaCatalog;
pub use descriptor::{TableDescriptor, VoidedEntry, SAMPLE_LIMIT};
pub use introspect::{ColumnInfo, ForeignKey, SchemaIntrospector, SqliteIntrospector};

/// Column whose presence marks a table as holding soft-deleted rows.
pub const VOID_FLAG_COLUMN: &str = "voided";

/// Internal bookkeeping tables that are never cataloged or archived.
const INTERNAL_PREFIXES: &[&str] = &["sqlite_", "liquibase", "databasechangelog"];

/// True for migration/bookkeeping tables the catalog must skip.
pub fn is_internal(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    INTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_prefixes() {
        assert!(is_internal("sqlite_sequence"));
        assert!(is_internal("liquibasechangelog"));
        assert!(is_internal("DATABASECHANGELOGLOCK"));
        assert!(!is_internal("patient"));
    }
}
