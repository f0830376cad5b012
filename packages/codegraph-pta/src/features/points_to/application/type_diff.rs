//! Declared-type vs. points-to disagreement detection
//!
//! A local declared with class `C` whose points-to set contains an object of
//! class `D` is reported when `D` is neither `C` nor a subclass of `C`.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::features::call_graph::domain::CallGraph;
use crate::features::points_to::domain::{DiffPtData, NodeID, Pag, PagValue};
use crate::shared::models::{Scene, Type};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TypeDiff {
    pub method: String,
    pub local: String,
    pub declared: String,
    pub actual: String,
    /// First object of the offending class
    pub object: NodeID,
}

/// Report locals whose pointees fall outside their declared class
///
/// A pointee of the declared class or of one of its subclasses is an ordinary
/// polymorphic binding and is not reported. One entry per
/// (method, local, pointee class), sorted.
pub fn detect_type_diffs(scene: &Scene, pag: &Pag, pts: &DiffPtData, cg: &CallGraph) -> Vec<TypeDiff> {
    let mut seen = BTreeSet::new();
    let mut diffs = Vec::new();

    for node in pag.nodes() {
        let PagValue::Local { func, name } = &node.value else {
            continue;
        };
        let Type::Class(declared) = &node.ty else {
            continue;
        };
        for obj in pts.get_pts(node.id).iter() {
            let Some(actual) = pag.node(obj).and_then(|o| o.ty.class_name()) else {
                continue;
            };
            if scene.is_subclass_of(actual, declared) {
                continue;
            }
            let method = cg
                .method(*func)
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("f{}", func));
            if seen.insert((method.clone(), name.clone(), actual.to_string())) {
                diffs.push(TypeDiff {
                    method,
                    local: name.clone(),
                    declared: declared.clone(),
                    actual: actual.to_string(),
                    object: obj,
                });
            }
        }
    }
    diffs.sort();
    diffs
}
