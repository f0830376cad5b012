//! Custom assertions for pointer-analysis results

use codegraph_pta::features::call_graph::domain::CallEdgeKind;
use codegraph_pta::features::points_to::domain::PagValue;
use codegraph_pta::{CallGraph, PointerAnalysis, ValueRef};

use super::builders::sig;

/// Classes of the heap objects `method`'s local `name` may point to
pub fn pointee_classes(pta: &PointerAnalysis<'_>, method: &str, name: &str) -> Vec<String> {
    let mut classes: Vec<String> = pta
        .related_heap_objects(&ValueRef::local(method, name))
        .iter()
        .filter_map(|n| n.ty.class_name().map(str::to_string))
        .collect();
    classes.sort();
    classes
}

/// Assert the local points to exactly objects of `expected` classes
pub fn assert_points_to_classes(pta: &PointerAnalysis<'_>, method: &str, name: &str, expected: &[&str]) {
    let actual = pointee_classes(pta, method, name);
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(
        actual, expected,
        "Unexpected pointees for {}::{}",
        method, name
    );
}

/// Assert every pointee of the local is an allocation site (not a fabricated object)
pub fn assert_only_allocations(pta: &PointerAnalysis<'_>, method: &str, name: &str) {
    for node in pta.related_heap_objects(&ValueRef::local(method, name)) {
        assert!(
            matches!(node.value, PagValue::Alloc { .. }),
            "Expected allocation site, got {}",
            node
        );
    }
}

pub fn has_edge(cg: &CallGraph, caller: &str, callee: &str) -> bool {
    let (Some(from), Some(to)) = (cg.func_id(&sig(caller)), cg.func_id(&sig(callee))) else {
        return false;
    };
    cg.callees_of(from).contains(&to)
}

/// Assert a call edge of the given kind exists
pub fn assert_call_edge(cg: &CallGraph, caller: &str, callee: &str, kind: CallEdgeKind) {
    let found = cg
        .edges()
        .iter()
        .any(|e| e.caller == sig(caller) && e.callee == sig(callee) && e.kind == kind);
    assert!(
        found,
        "Expected {:?} edge {} -> {}, edges: {:?}",
        kind,
        caller,
        callee,
        cg.edges()
    );
}

pub fn assert_no_call_edge(cg: &CallGraph, caller: &str, callee: &str) {
    assert!(
        !has_edge(cg, caller, callee),
        "Unexpected edge {} -> {}",
        caller,
        callee
    );
}
