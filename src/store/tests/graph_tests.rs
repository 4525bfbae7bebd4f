//! Tests for dependency graph traversal.

use super::{record_id, task};
use crate::store::graph::DependencyGraph;
use rstest::rstest;

#[rstest]
fn closure_lists_dependencies_before_dependents() {
    let records = [
        task("A", &["B", "C"]),
        task("B", &["D"]),
        task("C", &["D"]),
        task("D", &[]),
    ];
    let graph = DependencyGraph::from_records(&records);

    let order = graph.closure(&record_id("A")).expect("acyclic graph");

    assert_eq!(order.len(), 3);
    let position = |id: &str| order.iter().position(|entry| entry.as_str() == id);
    assert!(position("D") < position("B"));
    assert!(position("D") < position("C"));
}

#[rstest]
fn closure_reports_cycle_path() {
    let records = [task("A", &["B"]), task("B", &["C"]), task("C", &["A"])];
    let graph = DependencyGraph::from_records(&records);

    let cycle = graph.closure(&record_id("A")).expect_err("cycle expected");

    let rendered: Vec<&str> = cycle.path.iter().map(|id| id.as_str()).collect();
    assert_eq!(rendered, vec!["A", "B", "C", "A"]);
}

#[rstest]
fn self_dependency_is_a_cycle() {
    let graph = DependencyGraph::default().with_record(&task("A", &["A"]));

    assert!(graph.ensure_acyclic_from(&record_id("A")).is_err());
}

#[rstest]
fn substituted_record_replaces_edges() {
    let records = [task("A", &[]), task("B", &["A"])];
    let graph = DependencyGraph::from_records(&records).with_record(&task("A", &["B"]));

    assert!(graph.ensure_acyclic_from(&record_id("A")).is_err());
}

#[rstest]
fn dependents_are_direct_only() {
    let records = [task("A", &[]), task("B", &["A"]), task("C", &["B"])];
    let graph = DependencyGraph::from_records(&records);

    assert_eq!(graph.dependents(&record_id("A")), vec![record_id("B")]);
}

#[rstest]
fn missing_nodes_have_no_edges() {
    let graph = DependencyGraph::from_records(&[task("A", &["ghost"])]);

    let order = graph.closure(&record_id("A")).expect("acyclic graph");

    assert_eq!(order, vec![record_id("ghost")]);
}
