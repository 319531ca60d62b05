//! Archival planning: target-set selection and dependency-safe ordering.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::warn;

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::shadow::is_shadow;

/// Result of ordering a target set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopoOrder {
    /// Every edge inside the set is honored, child before parent.
    Complete(Vec<String>),
    /// A cycle or disconnected remainder forced a best-effort partial order;
    /// residual tables are appended in enumeration order.
    Partial(Vec<String>),
}

impl TopoOrder {
    /// Ordered table names.
    pub fn tables(&self) -> &[String] {
        match self {
            TopoOrder::Complete(tables) | TopoOrder::Partial(tables) => tables,
        }
    }

    /// Consume the order, yielding the table names.
    pub fn into_tables(self) -> Vec<String> {
        match self {
            TopoOrder::Complete(tables) | TopoOrder::Partial(tables) => tables,
        }
    }

    /// Whether the sort degraded to a partial order.
    pub fn is_partial(&self) -> bool {
        matches!(self, TopoOrder::Partial(_))
    }
}

/// Plans which tables one archival run touches, and in what order.
pub struct ArchivalPlanner<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> ArchivalPlanner<'g> {
    /// Plan against a freshly built dependency graph.
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Compute the set of tables one run must consider.
    ///
    /// With a target table, that is the target plus every table that
    /// directly or transitively references it: archiving a voided parent row
    /// first would orphan live child references, so all structural
    /// dependents ride along. Without a target, it is every voidable table.
    pub fn target_set(
        &self,
        target: Option<&str>,
        voidable: &[String],
    ) -> Result<BTreeSet<String>> {
        let mut set = BTreeSet::new();

        match target {
            Some(table) => {
                if is_shadow(table) {
                    return Err(Error::ShadowTarget(table.to_string()));
                }

                // Reverse adjacency: parent to the children referencing it.
                let mut reverse: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
                for (child, parents) in self.graph {
                    for parent in parents {
                        reverse.entry(parent.as_str()).or_default().push(child.as_str());
                    }
                }

                let mut queue = VecDeque::new();
                queue.push_back(table.to_string());
                set.insert(table.to_string());
                while let Some(current) = queue.pop_front() {
                    let Some(children) = reverse.get(current.as_str()) else {
                        continue;
                    };
                    for &child in children {
                        if is_shadow(child) || set.contains(child) {
                            continue;
                        }
                        set.insert(child.to_string());
                        queue.push_back(child.to_string());
                    }
                }
            }
            None => {
                for table in voidable {
                    if !is_shadow(table) {
                        set.insert(table.clone());
                    }
                }
            }
        }

        Ok(set)
    }

    /// Order a target set child-before-parent via Kahn's algorithm.
    ///
    /// Only edges with both endpoints inside the set count. An edge
    /// `child -> parent` increments the parent's in-degree, so children
    /// drain first. Residual nodes left by a cycle are appended in
    /// enumeration order rather than failing the run.
    pub fn order(&self, set: &BTreeSet<String>) -> TopoOrder {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for table in set {
            adjacency.insert(table.as_str(), Vec::new());
            in_degree.insert(table.as_str(), 0);
        }

        for (child, parents) in self.graph {
            if !set.contains(child) {
                continue;
            }
            for parent in parents {
                if !set.contains(parent) {
                    continue;
                }
                adjacency.get_mut(child.as_str()).unwrap().push(parent.as_str());
                *in_degree.get_mut(parent.as_str()).unwrap() += 1;
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&table, _)| table)
            .collect();

        let mut ordered = Vec::with_capacity(set.len());
        while let Some(table) = queue.pop_front() {
            ordered.push(table.to_string());
            for &parent in &adjacency[table] {
                let degree = in_degree.get_mut(parent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(parent);
                }
            }
        }

        if ordered.len() == set.len() {
            return TopoOrder::Complete(ordered);
        }

        warn!(
            sorted = ordered.len(),
            expected = set.len(),
            "dependency cycle detected, falling back to partial order"
        );
        for table in set {
            if !ordered.contains(table) {
                ordered.push(table.clone());
            }
        }
        TopoOrder::Partial(ordered)
    }

    /// Full plan: target set plus its ordering.
    pub fn plan(&self, target: Option<&str>, voidable: &[String]) -> Result<TopoOrder> {
        let set = self.target_set(target, voidable)?;
        Ok(self.order(&set))
    }
}
