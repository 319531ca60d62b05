//! Dialect-specific statement strategies.
//!
//! Each variant produces the same logical effect through its product's
//! idiomatic statement: an empty structural copy for shadow creation, and a
//! session-scoped toggle for referential-integrity enforcement.

/// Supported database products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// SQLite (the bundled driver's native product).
    #[default]
    Sqlite,
    /// MySQL / MariaDB.
    Mysql,
}

impl Dialect {
    /// Quote an identifier for this dialect.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::Mysql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    /// Statement creating an empty structural copy of `source` named `shadow`.
    pub fn create_shadow_sql(&self, shadow: &str, source: &str) -> String {
        match self {
            // SQLite has no CREATE TABLE .. LIKE; a filtered CTAS yields the
            // same column set with no rows.
            Dialect::Sqlite => format!(
                "CREATE TABLE {} AS SELECT * FROM {} WHERE 0",
                self.quote(shadow),
                self.quote(source)
            ),
            Dialect::Mysql => format!(
                "CREATE TABLE {} LIKE {}",
                self.quote(shadow),
                self.quote(source)
            ),
        }
    }

    /// Statement adding one column to an existing table.
    pub fn add_column_sql(&self, table: &str, column: &str, declared_type: &str) -> String {
        let column_type = if declared_type.is_empty() {
            self.default_column_type()
        } else {
            declared_type
        };
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote(table),
            self.quote(column),
            column_type
        )
    }

    /// Fallback type when the source reports none.
    fn default_column_type(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "TEXT",
            Dialect::Mysql => "VARCHAR(255)",
        }
    }

    /// Statement suspending referential-integrity enforcement.
    ///
    /// Both variants are connection-scoped: the toggle never outlives the
    /// session that issued it.
    pub fn suspend_constraints_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "PRAGMA foreign_keys = OFF",
            Dialect::Mysql => "SET FOREIGN_KEY_CHECKS = 0",
        }
    }

    /// Statement restoring referential-integrity enforcement.
    pub fn restore_constraints_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "PRAGMA foreign_keys = ON",
            Dialect::Mysql => "SET FOREIGN_KEY_CHECKS = 1",
        }
    }

    /// INSERT verb that skips rows conflicting with existing ones.
    pub fn insert_ignore(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "INSERT OR IGNORE",
            Dialect::Mysql => "INSERT IGNORE",
        }
    }
}
