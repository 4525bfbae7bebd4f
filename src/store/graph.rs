//! Dependency graph over record `depends_on` edges.

use crate::record::domain::{Record, RecordId};
use std::collections::{BTreeMap, BTreeSet, HashMap, btree_set};
use thiserror::Error;

static NO_EDGES: BTreeSet<RecordId> = BTreeSet::new();

/// A dependency cycle, listed from the first repeated record back to itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("dependency cycle detected: {}", render_path(.path))]
pub struct CycleDetected {
    /// Records along the cycle; the first and last entries are equal.
    pub path: Vec<RecordId>,
}

fn render_path(path: &[RecordId]) -> String {
    path.iter()
        .map(RecordId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Finished,
}

/// Snapshot of `depends_on` edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<RecordId, BTreeSet<RecordId>>,
}

impl DependencyGraph {
    /// Builds a graph from records.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let edges = records
            .into_iter()
            .map(|record| (record.id().clone(), record.depends_on().clone()))
            .collect();
        Self { edges }
    }

    /// Replaces the outgoing edges of `record` with its current dependencies.
    #[must_use]
    pub fn with_record(mut self, record: &Record) -> Self {
        self.edges
            .insert(record.id().clone(), record.depends_on().clone());
        self
    }

    /// Returns the direct dependencies of `id`.
    #[must_use]
    pub fn dependencies(&self, id: &RecordId) -> &BTreeSet<RecordId> {
        self.edges.get(id).unwrap_or(&NO_EDGES)
    }

    /// Returns the records that directly depend on `id`, ordered by id.
    #[must_use]
    pub fn dependents(&self, id: &RecordId) -> Vec<RecordId> {
        self.edges
            .iter()
            .filter(|(_, dependencies)| dependencies.contains(id))
            .map(|(dependent, _)| dependent.clone())
            .collect()
    }

    /// Returns every record `root` transitively depends on.
    ///
    /// The traversal is depth-first and the result lists dependencies before
    /// the records that need them, so it is a valid completion order. `root`
    /// itself is not included.
    ///
    /// # Errors
    ///
    /// Returns [`CycleDetected`] when a cycle is reachable from `root`.
    pub fn closure(&self, root: &RecordId) -> Result<Vec<RecordId>, CycleDetected> {
        let mut marks: HashMap<&RecordId, Mark> = HashMap::new();
        let mut order = Vec::new();
        let mut path: Vec<&RecordId> = vec![root];
        let mut stack: Vec<btree_set::Iter<'_, RecordId>> = vec![self.dependencies(root).iter()];
        marks.insert(root, Mark::Visiting);

        while let Some(frame) = stack.last_mut() {
            match frame.next() {
                Some(next) => match marks.get(next) {
                    Some(Mark::Visiting) => return Err(cycle_from(&path, next)),
                    Some(Mark::Finished) => {}
                    None => {
                        marks.insert(next, Mark::Visiting);
                        path.push(next);
                        stack.push(self.dependencies(next).iter());
                    }
                },
                None => {
                    stack.pop();
                    if let Some(finished) = path.pop() {
                        marks.insert(finished, Mark::Finished);
                        if finished != root {
                            order.push(finished.clone());
                        }
                    }
                }
            }
        }

        Ok(order)
    }

    /// Checks that no cycle is reachable from `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CycleDetected`] naming the offending path.
    pub fn ensure_acyclic_from(&self, id: &RecordId) -> Result<(), CycleDetected> {
        self.closure(id).map(|_| ())
    }
}

fn cycle_from(path: &[&RecordId], repeated: &RecordId) -> CycleDetected {
    let start = path
        .iter()
        .position(|step| *step == repeated)
        .unwrap_or_default();
    let mut cycle: Vec<RecordId> = path
        .get(start..)
        .unwrap_or_default()
        .iter()
        .map(|step| (*step).clone())
        .collect();
    cycle.push(repeated.clone());
    CycleDetected { path: cycle }
}
