//! Engine error types.

use thiserror::Error;

/// Archival engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Driver-level SQL error.
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Per-table metadata query failure.
    #[error("introspection failed for table {table}: {source}")]
    Introspection {
        /// Table whose metadata query failed.
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Shadow table create or column-sync failure.
    #[error("shadow creation failed for table {table}: {source}")]
    ShadowCreation {
        /// Source table whose shadow could not be created or synced.
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Transactional failure inside a batch move.
    #[error("batch move failed for table {table}: {source}")]
    BatchMove {
        /// Source table whose batch was rolled back.
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Failure while merging archived rows back into the source.
    #[error("restore failed for table {table}: {source}")]
    Restore {
        /// Source table whose restore was rolled back.
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Archival was requested for a shadow table.
    #[error("cannot archive a shadow table: {0}")]
    ShadowTarget(String),

    /// Destructive operation refused for a name without the shadow prefix.
    #[error("refusing to drop non-shadow table: {0}")]
    GuardRejection(String),

    /// No declared primary key and no conventional identifier column.
    #[error("no identifier column found for table {0}")]
    NoIdentifier(String),

    /// No shadow table exists for the requested source table.
    #[error("no shadow table exists for source table {0}")]
    MissingShadow(String),
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, Error>;
