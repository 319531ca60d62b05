//! Foreign-key dependency graph construction.

use std::collections::BTreeMap;

use tracing::warn;

use crate::catalog::{is_internal, SchemaIntrospector};
use crate::error::Result;
use crate::shadow::is_shadow;

/// Directed dependency mapping: child table to the parent tables it
/// references through foreign keys.
///
/// Tables holding no foreign keys are absent from the map. Computed fresh
/// per planning call and never mutated afterwards.
pub type DependencyGraph = BTreeMap<String, Vec<String>>;

/// Build the child-to-parents graph for every ordinary table.
///
/// Self-references are excluded and duplicate edges collapsed. A failed key
/// lookup on one table is logged and that table skipped; it never aborts the
/// whole graph.
pub fn build_dependency_graph(intro: &dyn SchemaIntrospector) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::new();

    for table in intro.table_names()? {
        if is_internal(&table) || is_shadow(&table) {
            continue;
        }
        let keys = match intro.foreign_keys(&table) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(table = %table, error = %e, "skipping table in dependency graph");
                continue;
            }
        };

        let mut parents: Vec<String> = Vec::new();
        for key in keys {
            if key.referenced_table == table || parents.contains(&key.referenced_table) {
                continue;
            }
            parents.push(key.referenced_table);
        }
        if !parents.is_empty() {
            graph.insert(table, parents);
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteIntrospector;
    use rusqlite::Connection;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE person (person_id INTEGER PRIMARY KEY);
            CREATE TABLE visit (
                visit_id INTEGER PRIMARY KEY,
                person_id INTEGER REFERENCES person(person_id),
                creator INTEGER REFERENCES person(person_id),
                parent_visit INTEGER REFERENCES visit(visit_id)
            );
            CREATE TABLE archive_visit (
                visit_id INTEGER,
                person_id INTEGER REFERENCES person(person_id)
            );
            CREATE TABLE liquibasechangelog (id TEXT);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_child_to_parent_edges() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);
        let graph = build_dependency_graph(&intro).unwrap();

        // Duplicate references to person collapse; self-reference excluded.
        assert_eq!(graph.get("visit").unwrap(), &vec!["person".to_string()]);
    }

    #[test]
    fn test_childless_tables_absent() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);
        let graph = build_dependency_graph(&intro).unwrap();

        assert!(!graph.contains_key("person"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_shadow_and_internal_tables_excluded() {
        let conn = fixture();
        let intro = SqliteIntrospector::new(&conn);
        let graph = build_dependency_graph(&intro).unwrap();

        assert!(!graph.contains_key("archive_visit"));
        assert!(!graph.contains_key("liquibasechangelog"));
    }
}
