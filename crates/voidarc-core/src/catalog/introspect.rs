//! Structural metadata access over the live connection.
//!
//! The engine never carries compile-time schema knowledge; everything it
//! needs about tables, columns, and keys is discovered through this
//! capability interface at run time.

use rusqlite::Connection;

use crate::error::{Error, Result};

/// One column's reported metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type as reported by the database (may be empty).
    pub declared_type: String,
    /// Whether the column is part of the declared primary key.
    pub is_primary_key: bool,
}

/// A foreign key held by one table referencing another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column on the child table.
    pub column: String,
    /// Referenced (parent) table.
    pub referenced_table: String,
    /// Referenced column on the parent table.
    pub referenced_column: String,
}

/// Capability interface over a database's native metadata facility.
pub trait SchemaIntrospector {
    /// Names of all ordinary tables in the active schema.
    fn table_names(&self) -> Result<Vec<String>>;

    /// Column metadata for one table, in declaration order.
    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Foreign keys held by one table.
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>>;

    /// Whether a table exists in the active schema.
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Whether a table has a column with the given name.
    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.columns(table)?.iter().any(|c| c.name == column))
    }

    /// First declared primary-key column, if any.
    fn primary_key(&self, table: &str) -> Result<Option<String>> {
        Ok(self
            .columns(table)?
            .into_iter()
            .find(|c| c.is_primary_key)
            .map(|c| c.name))
    }
}

/// Introspector bound to SQLite's `sqlite_master` and pragma facilities.
pub struct SqliteIntrospector<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteIntrospector<'c> {
    /// Wrap an open connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn introspection_error(table: &str, source: rusqlite::Error) -> Error {
        Error::Introspection {
            table: table.to_string(),
            source,
        }
    }
}

impl SchemaIntrospector for SqliteIntrospector<'_> {
    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1)")
            .map_err(|e| Self::introspection_error(table, e))?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    is_primary_key: row.get::<_, i64>(2)? > 0,
                })
            })
            .map_err(|e| Self::introspection_error(table, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Self::introspection_error(table, e))?;
        Ok(columns)
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1)")
            .map_err(|e| Self::introspection_error(table, e))?;
        let keys = stmt
            .query_map([table], |row| {
                Ok(ForeignKey {
                    referenced_table: row.get(0)?,
                    column: row.get(1)?,
                    // SQLite reports NULL for implicit references to the parent's pk.
                    referenced_column: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })
            .map_err(|e| Self::introspection_error(table, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Self::introspection_error(table, e))?;
        Ok(keys)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE person (
                person_id INTEGER PRIMARY KEY,
                uuid TEXT,
                voided INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE visit (
                visit_id INTEGER PRIMARY KEY,
                person_id INTEGER NOT NULL,
                voided INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (person_id) REFERENCES person(person_id)
            );
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_table_names() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);
        assert_eq!(intro.table_names().unwrap(), vec!["person", "visit"]);
    }

    #[test]
    fn test_columns_and_primary_key() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);

        let columns = intro.columns("person").unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "person_id");
        assert!(columns[0].is_primary_key);
        assert!(!columns[2].is_primary_key);

        assert_eq!(
            intro.primary_key("visit").unwrap(),
            Some("visit_id".to_string())
        );
    }

    #[test]
    fn test_has_column() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);
        assert!(intro.has_column("person", "voided").unwrap());
        assert!(!intro.has_column("person", "date_voided").unwrap());
    }

    #[test]
    fn test_foreign_keys() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);

        let keys = intro.foreign_keys("visit").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].referenced_table, "person");
        assert_eq!(keys[0].column, "person_id");
        assert_eq!(keys[0].referenced_column, "person_id");

        assert!(intro.foreign_keys("person").unwrap().is_empty());
    }

    #[test]
    fn test_table_exists() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);
        assert!(intro.table_exists("person").unwrap());
        assert!(!intro.table_exists("archive_person").unwrap());
    }
}
