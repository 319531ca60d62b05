//! Table descriptors returned by catalog queries.

use serde::{Deserialize, Serialize};

/// Maximum number of sample voided entries captured per table.
pub const SAMPLE_LIMIT: usize = 50;

/// One sample voided row from a voidable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidedEntry {
    /// Row identifier (uuid when the table has one, empty otherwise).
    pub record_id: String,
    /// Label for the user who voided the row.
    pub voided_by: String,
    /// Void timestamp as reported by the database.
    pub voided_at: Option<String>,
    /// Reason recorded at void time.
    pub void_reason: Option<String>,
}

/// Metadata for one relational table.
///
/// Built fresh on every catalog query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name (unique within the schema).
    pub name: String,
    /// Whether the table carries the void-marker column.
    pub is_voidable: bool,
    /// Total row count, when it could be queried.
    pub total_records: Option<u64>,
    /// Voided row count, when it could be queried.
    pub voided_records: Option<u64>,
    /// Human-readable name derived from the table name.
    pub display_name: String,
    /// Up to [`SAMPLE_LIMIT`] sample voided rows, newest first when orderable.
    pub voided_entries: Vec<VoidedEntry>,
}

impl TableDescriptor {
    /// Create a descriptor with counts and samples unset.
    pub fn new(name: impl Into<String>, is_voidable: bool) -> Self {
        let name = name.into();
        let display_name = prettify(&name);
        Self {
            name,
            is_voidable,
            total_records: None,
            voided_records: None,
            display_name,
            voided_entries: Vec::new(),
        }
    }
}

/// Derive a human-readable name from a snake_case table name.
fn prettify(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
