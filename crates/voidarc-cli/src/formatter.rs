//! Output formatters for catalog listings, graphs, and run reports.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use voidarc_core::{ArchivalReport, DependencyGraph, TableDescriptor};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a table listing.
pub fn format_descriptors(descriptors: &[TableDescriptor], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(descriptors).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
        OutputFormat::Table => {
            if descriptors.is_empty() {
                return "No tables".to_string();
            }
            let mut table = Table::new();
            table.set_header(vec!["Table", "Display Name", "Voidable", "Rows", "Voided"]);
            for desc in descriptors {
                table.add_row(vec![
                    Cell::new(&desc.name),
                    Cell::new(&desc.display_name),
                    Cell::new(if desc.is_voidable { "yes" } else { "no" }),
                    Cell::new(
                        desc.total_records
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ),
                    Cell::new(
                        desc.voided_records
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ),
                ]);
            }
            table.to_string()
        }
    }
}

/// Render the child-to-parents dependency graph.
pub fn format_graph(graph: &DependencyGraph, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(graph).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
        OutputFormat::Table => {
            if graph.is_empty() {
                return "No foreign-key dependencies".to_string();
            }
            let mut table = Table::new();
            table.set_header(vec!["Child", "References"]);
            for (child, parents) in graph {
                table.add_row(vec![Cell::new(child), Cell::new(parents.join(", "))]);
            }
            table.to_string()
        }
    }
}

/// Render an archival run report.
pub fn format_report(report: &ArchivalReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["Table", "Rows Moved", "Status"]);
            for outcome in &report.tables {
                table.add_row(vec![
                    Cell::new(&outcome.table),
                    Cell::new(outcome.rows_moved),
                    Cell::new(outcome.error.as_deref().unwrap_or("ok")),
                ]);
            }
            let mut output = table.to_string();
            output.push_str(&format!("\n{} row(s) archived", report.rows_moved()));
            if report.partial_order {
                output.push_str("\nwarning: dependency cycle forced a partial processing order");
            }
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing() {
        assert_eq!(format_descriptors(&[], OutputFormat::Table), "No tables");
    }

    #[test]
    fn test_json_listing_is_valid_json() {
        let descriptors = vec![TableDescriptor::new("visit_note", true)];
        let json = format_descriptors(&descriptors, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "visit_note");
        assert_eq!(parsed[0]["display_name"], "Visit Note");
    }

    #[test]
    fn test_report_totals() {
        let report = ArchivalReport::default();
        let rendered = format_report(&report, OutputFormat::Table);
        assert!(rendered.contains("0 row(s) archived"));
    }
}
