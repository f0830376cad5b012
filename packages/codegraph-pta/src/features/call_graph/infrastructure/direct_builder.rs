//! Direct call-graph construction (no points-to information)
//!
//! Worklist over reachable methods starting from the given entries. Virtual
//! call sites are remembered so that algorithms whose knowledge grows (RTA)
//! can re-resolve them until nothing changes.
//!
//! A virtual site gets Direct edges only when the class hierarchy alone
//! admits a single target; otherwise every edge of the site is Dynamic. The
//! kind is fixed when the site is first seen, so re-resolution never changes
//! it.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::config::CallGraphKind;
use crate::features::call_graph::domain::{
    CallGraph, CallGraphNodeKind, CallSiteID, DynCallKind, FuncID,
};
use crate::features::call_graph::ports::CallGraphAlgorithm;
use crate::shared::models::{InvokeExpr, MethodSignature, Scene, StmtRef};

use super::algorithms::{ClassHierarchyAnalysis, RapidTypeAnalysis};

/// Node kind for a method of the scene
pub fn node_kind(scene: &Scene, method: &MethodSignature) -> CallGraphNodeKind {
    if scene.is_sdk_method(method) {
        CallGraphNodeKind::Sdk
    } else {
        CallGraphNodeKind::Real
    }
}

struct VirtualSite {
    caller: FuncID,
    call_site: CallSiteID,
    invoke: InvokeExpr,
    direct: bool,
}

pub struct DirectCallGraphBuilder<'a, A: CallGraphAlgorithm> {
    scene: &'a Scene,
    algorithm: A,
    cg: CallGraph,
    worklist: VecDeque<FuncID>,
    visited: FxHashSet<FuncID>,
    virtual_sites: Vec<VirtualSite>,
}

impl<'a, A: CallGraphAlgorithm> DirectCallGraphBuilder<'a, A> {
    pub fn new(scene: &'a Scene, algorithm: A) -> Self {
        Self {
            scene,
            algorithm,
            cg: CallGraph::new(),
            worklist: VecDeque::new(),
            visited: FxHashSet::default(),
            virtual_sites: Vec::new(),
        }
    }

    fn add_func(&mut self, method: &MethodSignature) -> FuncID {
        let func = self.cg.add_node(method, node_kind(self.scene, method));
        if !self.visited.contains(&func) {
            self.worklist.push_back(func);
        }
        func
    }

    pub fn build(mut self, entries: &[MethodSignature]) -> CallGraph {
        for entry in entries {
            if self.scene.method(entry).is_none() {
                warn!("Entry {} not found in scene", entry);
                continue;
            }
            self.add_func(entry);
        }

        loop {
            let mut revisit = false;
            while let Some(func) = self.worklist.pop_front() {
                if !self.visited.insert(func) {
                    continue;
                }
                revisit |= self.process_method(func);
            }

            if !revisit {
                break;
            }
            self.reresolve_virtual_sites();
            if self.worklist.is_empty() {
                break;
            }
        }

        info!(
            algorithm = self.algorithm.name(),
            nodes = self.cg.node_count(),
            edges = self.cg.edge_count(),
            "Direct call graph built"
        );
        self.cg
    }

    /// Returns whether the algorithm's knowledge changed
    fn process_method(&mut self, func: FuncID) -> bool {
        let scene = self.scene;
        let Some(sig) = self.cg.method(func).cloned() else {
            return false;
        };
        let Some(method) = scene.method(&sig) else {
            return false;
        };
        let changed = self.algorithm.on_method_reached(scene, method);
        let Some(body) = &method.body else {
            return changed;
        };

        for (index, stmt) in body.stmts() {
            let Some(invoke) = stmt.invoke() else {
                continue;
            };
            let stmt_ref = StmtRef::new(sig.clone(), index);
            let result = stmt.invoke_result().cloned();
            let targets = self.algorithm.resolve(scene, invoke);

            match invoke {
                InvokeExpr::Static { method: callee, args }
                | InvokeExpr::Special {
                    method: callee,
                    args,
                    ..
                } => {
                    let Some(target) = targets.first() else {
                        warn!("Unknown static callee {} at {}", callee, stmt_ref);
                        continue;
                    };
                    let callee_id = self.add_func(target);
                    let receiver = invoke.base().cloned();
                    let cs = self.cg.add_call_site(
                        stmt_ref,
                        func,
                        callee_id,
                        args.clone(),
                        receiver,
                        result,
                    );
                    self.cg.add_direct_edge(func, callee_id, cs);
                }
                InvokeExpr::Instance { base, method: callee, args } => {
                    let cs = self.cg.add_dyn_call_site(
                        stmt_ref,
                        func,
                        base.clone(),
                        DynCallKind::Virtual {
                            method_name: callee.name.clone(),
                        },
                        args.clone(),
                        result,
                    );
                    let direct = ClassHierarchyAnalysis.resolve(scene, invoke).len() == 1;
                    self.add_virtual_edges(func, cs, &targets, direct);
                    self.virtual_sites.push(VirtualSite {
                        caller: func,
                        call_site: cs,
                        invoke: invoke.clone(),
                        direct,
                    });
                }
                InvokeExpr::Pointer { .. } => {
                    debug!("Function pointer call at {} left unresolved", stmt_ref);
                }
            }
        }
        changed
    }

    fn add_virtual_edges(&mut self, caller: FuncID, cs: CallSiteID, targets: &[MethodSignature], direct: bool) {
        for target in targets {
            let callee = self.add_func(target);
            if direct {
                self.cg.add_direct_edge(caller, callee, cs);
            } else {
                self.cg.add_dynamic_edge(caller, callee, cs);
            }
        }
    }

    fn reresolve_virtual_sites(&mut self) {
        let sites = std::mem::take(&mut self.virtual_sites);
        for site in &sites {
            let targets = self.algorithm.resolve(self.scene, &site.invoke);
            self.add_virtual_edges(site.caller, site.call_site, &targets, site.direct);
        }
        self.virtual_sites = sites;
    }
}

/// Build a direct call graph from `entries` with the chosen algorithm
pub fn build_call_graph(scene: &Scene, entries: &[MethodSignature], kind: CallGraphKind) -> CallGraph {
    match kind {
        CallGraphKind::Cha => DirectCallGraphBuilder::new(scene, ClassHierarchyAnalysis).build(entries),
        CallGraphKind::Rta => DirectCallGraphBuilder::new(scene, RapidTypeAnalysis::new()).build(entries),
    }
}

/// Methods with bodies that nothing calls, per a whole-program direct call graph
pub fn default_entries(scene: &Scene, kind: CallGraphKind) -> Vec<MethodSignature> {
    let all: Vec<MethodSignature> = scene
        .methods()
        .filter(|m| m.has_body() && !scene.is_sdk_method(&m.signature))
        .map(|m| m.signature.clone())
        .collect();
    let cg = build_call_graph(scene, &all, kind);
    cg.entries()
        .into_iter()
        .filter_map(|f| cg.node(f))
        .filter(|n| n.kind == CallGraphNodeKind::Real)
        .map(|n| n.method.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::call_graph::domain::CallEdgeKind;
    use crate::shared::models::{MethodBuilder, SceneBuilder, Type};

    fn scene() -> Scene {
        SceneBuilder::new()
            .class("Animal", None)
            .class("Dog", Some("Animal"))
            .class("Cat", Some("Animal"))
            .method(MethodBuilder::instance("Animal", "speak").build())
            .method(MethodBuilder::instance("Dog", "speak").build())
            .method(MethodBuilder::instance("Cat", "speak").build())
            .method(MethodBuilder::instance("Dog", "constructor").build())
            .method(
                MethodBuilder::static_fn("Main", "main")
                    .local("a", Type::class("Animal"))
                    .new_obj("d", "Dog")
                    .call_special(None, "d", MethodSignature::new("Dog", "constructor"), &[])
                    .assign("a", "d")
                    .call_virtual(None, "a", "speak", &[])
                    .build(),
            )
            .build()
    }

    fn callees(cg: &CallGraph, caller: &MethodSignature) -> Vec<String> {
        let id = cg.func_id(caller).unwrap();
        cg.callees_of(id)
            .into_iter()
            .map(|f| cg.method(f).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_cha_graph() {
        let scene = scene();
        let main = MethodSignature::new("Main", "main");
        let cg = build_call_graph(&scene, &[main.clone()], CallGraphKind::Cha);

        let mut got = callees(&cg, &main);
        got.sort();
        assert_eq!(
            got,
            vec!["Animal.speak", "Cat.speak", "Dog.constructor", "Dog.speak"]
        );
    }

    #[test]
    fn test_rta_graph() {
        let scene = scene();
        let main = MethodSignature::new("Main", "main");
        let cg = build_call_graph(&scene, &[main.clone()], CallGraphKind::Rta);

        let mut got = callees(&cg, &main);
        got.sort();
        assert_eq!(got, vec!["Dog.constructor", "Dog.speak"]);
    }

    #[test]
    fn test_virtual_edge_kind_stable_across_rounds() {
        // Cat is only instantiated in a method reached after a.speak() was
        // first resolved, so RTA resolves the site twice
        let scene = SceneBuilder::new()
            .class("Animal", None)
            .class("Dog", Some("Animal"))
            .class("Cat", Some("Animal"))
            .method(MethodBuilder::instance("Dog", "speak").build())
            .method(MethodBuilder::instance("Cat", "speak").build())
            .method(MethodBuilder::static_fn("Main", "later").new_obj("c", "Cat").build())
            .method(
                MethodBuilder::static_fn("Main", "main")
                    .local("a", Type::class("Animal"))
                    .new_obj("d", "Dog")
                    .assign("a", "d")
                    .call_virtual(None, "a", "speak", &[])
                    .call_static(None, MethodSignature::new("Main", "later"), &[])
                    .build(),
            )
            .build();
        let main = MethodSignature::new("Main", "main");

        for kind in [CallGraphKind::Cha, CallGraphKind::Rta] {
            let cg = build_call_graph(&scene, &[main.clone()], kind);
            let speak_edges: Vec<_> = cg
                .edges()
                .into_iter()
                .filter(|e| e.callee.name == "speak")
                .collect();
            assert_eq!(speak_edges.len(), 2, "{:?}", kind);
            assert!(speak_edges.iter().all(|e| e.kind == CallEdgeKind::Dynamic));
        }
    }

    #[test]
    fn test_single_hierarchy_target_is_direct() {
        let scene = SceneBuilder::new()
            .class("Leaf", None)
            .method(MethodBuilder::instance("Leaf", "go").build())
            .method(
                MethodBuilder::static_fn("Main", "main")
                    .new_obj("l", "Leaf")
                    .call_virtual(None, "l", "go", &[])
                    .build(),
            )
            .build();
        let main = MethodSignature::new("Main", "main");

        for kind in [CallGraphKind::Cha, CallGraphKind::Rta] {
            let cg = build_call_graph(&scene, &[main.clone()], kind);
            let edges = cg.edges();
            assert_eq!(edges.len(), 1);
            assert_eq!(edges[0].kind, CallEdgeKind::Direct);
        }
    }

    #[test]
    fn test_default_entries() {
        let scene = scene();
        let entries = default_entries(&scene, CallGraphKind::Cha);
        assert_eq!(entries, vec![MethodSignature::new("Main", "main")]);
    }
}
