//! Call graph: functions, call sites and call edges
//!
//! Nodes live in a petgraph arena; a `FuncID` is the node's index. Edges are
//! deduplicated on (caller, callee, call site), so re-adding is a no-op.

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fmt;

use crate::shared::models::{Local, MethodSignature, StmtRef, Value};

use super::call_site::{CallSite, CallSiteID, DynCallKind, DynCallSite};

/// Function identifier (index of the call-graph node)
pub type FuncID = u32;

/// Whether a function has analyzable code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallGraphNodeKind {
    /// Method with a body (or a non-SDK declaration)
    Real,
    /// Declared in SDK stubs; modelled, not analyzed
    Sdk,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallGraphNode {
    pub id: FuncID,
    pub method: MethodSignature,
    pub kind: CallGraphNodeKind,
}

impl fmt::Display for CallGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallGraphNodeKind::Real => write!(f, "{}", self.method),
            CallGraphNodeKind::Sdk => write!(f, "[sdk] {}", self.method),
        }
    }
}

/// Edge origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallEdgeKind {
    /// Resolved from the statement alone
    Direct,
    /// Resolved from receiver / function-pointer information
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallGraphEdge {
    pub kind: CallEdgeKind,
    pub call_site: CallSiteID,
}

impl fmt::Display for CallGraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallEdgeKind::Direct => write!(f, "cs{}", self.call_site),
            CallEdgeKind::Dynamic => write!(f, "cs{} (dyn)", self.call_site),
        }
    }
}

/// Edge listing entry (for reports)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEdgeRecord {
    pub caller: MethodSignature,
    pub callee: MethodSignature,
    pub call_site: CallSiteID,
    pub kind: CallEdgeKind,
}

#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<CallGraphNode, CallGraphEdge>,
    by_method: FxHashMap<MethodSignature, FuncID>,
    edge_keys: FxHashSet<(FuncID, FuncID, CallSiteID)>,

    call_sites: FxHashMap<CallSiteID, CallSite>,
    dyn_call_sites: FxHashMap<CallSiteID, DynCallSite>,
    site_by_stmt: FxHashMap<StmtRef, CallSiteID>,
    next_call_site: CallSiteID,

    dynamic_edges: usize,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Nodes
    // ═══════════════════════════════════════════════════════════════════════

    /// Node for `method`, created on first request
    pub fn add_node(&mut self, method: &MethodSignature, kind: CallGraphNodeKind) -> FuncID {
        if let Some(&id) = self.by_method.get(method) {
            return id;
        }
        let id = self.graph.node_count() as FuncID;
        self.graph.add_node(CallGraphNode {
            id,
            method: method.clone(),
            kind,
        });
        self.by_method.insert(method.clone(), id);
        id
    }

    #[inline]
    pub fn func_id(&self, method: &MethodSignature) -> Option<FuncID> {
        self.by_method.get(method).copied()
    }

    pub fn node(&self, func: FuncID) -> Option<&CallGraphNode> {
        self.graph.node_weight(NodeIndex::new(func as usize))
    }

    pub fn method(&self, func: FuncID) -> Option<&MethodSignature> {
        self.node(func).map(|n| &n.method)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CallGraphNode> {
        self.graph.node_weights()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Call sites
    // ═══════════════════════════════════════════════════════════════════════

    fn fresh_call_site_id(&mut self) -> CallSiteID {
        let id = self.next_call_site;
        self.next_call_site += 1;
        id
    }

    /// Register a statically resolved call site (idempotent per statement)
    pub fn add_call_site(
        &mut self,
        stmt: StmtRef,
        caller: FuncID,
        callee: FuncID,
        args: Vec<Value>,
        receiver: Option<Local>,
        result: Option<Local>,
    ) -> CallSiteID {
        if let Some(&id) = self.site_by_stmt.get(&stmt) {
            return id;
        }
        let id = self.fresh_call_site_id();
        self.site_by_stmt.insert(stmt.clone(), id);
        self.call_sites.insert(
            id,
            CallSite {
                id,
                stmt,
                caller,
                callee,
                args,
                receiver,
                result,
            },
        );
        id
    }

    /// Register a dynamic call site (idempotent per statement)
    pub fn add_dyn_call_site(
        &mut self,
        stmt: StmtRef,
        caller: FuncID,
        base: Local,
        kind: DynCallKind,
        args: Vec<Value>,
        result: Option<Local>,
    ) -> CallSiteID {
        if let Some(&id) = self.site_by_stmt.get(&stmt) {
            return id;
        }
        let id = self.fresh_call_site_id();
        self.site_by_stmt.insert(stmt.clone(), id);
        self.dyn_call_sites.insert(
            id,
            DynCallSite {
                id,
                stmt,
                caller,
                base,
                kind,
                args,
                result,
            },
        );
        id
    }

    pub fn call_site(&self, id: CallSiteID) -> Option<&CallSite> {
        self.call_sites.get(&id)
    }

    pub fn dyn_call_site(&self, id: CallSiteID) -> Option<&DynCallSite> {
        self.dyn_call_sites.get(&id)
    }

    /// Static call sites registered for a statement
    pub fn call_sites_at(&self, stmt: &StmtRef) -> Vec<&CallSite> {
        self.site_by_stmt
            .get(stmt)
            .and_then(|id| self.call_sites.get(id))
            .into_iter()
            .collect()
    }

    /// Dynamic call sites inside `func`, ordered by ID
    pub fn dyn_call_sites_of(&self, func: FuncID) -> Vec<&DynCallSite> {
        let mut sites: Vec<&DynCallSite> = self
            .dyn_call_sites
            .values()
            .filter(|s| s.caller == func)
            .collect();
        sites.sort_by_key(|s| s.id);
        sites
    }

    pub fn call_site_count(&self) -> usize {
        self.call_sites.len() + self.dyn_call_sites.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    fn add_edge(
        &mut self,
        caller: FuncID,
        callee: FuncID,
        call_site: CallSiteID,
        kind: CallEdgeKind,
    ) -> bool {
        let count = self.graph.node_count() as FuncID;
        if caller >= count || callee >= count {
            return false;
        }
        if !self.edge_keys.insert((caller, callee, call_site)) {
            return false;
        }
        self.graph.add_edge(
            NodeIndex::new(caller as usize),
            NodeIndex::new(callee as usize),
            CallGraphEdge { kind, call_site },
        );
        if kind == CallEdgeKind::Dynamic {
            self.dynamic_edges += 1;
        }
        true
    }

    /// Statically resolved edge; true if new
    pub fn add_direct_edge(&mut self, caller: FuncID, callee: FuncID, call_site: CallSiteID) -> bool {
        self.add_edge(caller, callee, call_site, CallEdgeKind::Direct)
    }

    /// Edge discovered through receiver / pointer resolution; true if new
    pub fn add_dynamic_edge(&mut self, caller: FuncID, callee: FuncID, call_site: CallSiteID) -> bool {
        self.add_edge(caller, callee, call_site, CallEdgeKind::Dynamic)
    }

    fn neighbors(&self, func: FuncID, dir: Direction) -> Vec<FuncID> {
        if func as usize >= self.graph.node_count() {
            return Vec::new();
        }
        let mut ids: Vec<FuncID> = self
            .graph
            .neighbors_directed(NodeIndex::new(func as usize), dir)
            .map(|n| n.index() as FuncID)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn callees_of(&self, func: FuncID) -> Vec<FuncID> {
        self.neighbors(func, Direction::Outgoing)
    }

    pub fn callers_of(&self, func: FuncID) -> Vec<FuncID> {
        self.neighbors(func, Direction::Incoming)
    }

    /// Functions with no incoming edge
    pub fn entries(&self) -> Vec<FuncID> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| n.index() as FuncID)
            .collect()
    }

    pub fn edges(&self) -> Vec<CallEdgeRecord> {
        self.graph
            .edge_references()
            .map(|e| CallEdgeRecord {
                caller: self.graph[e.source()].method.clone(),
                callee: self.graph[e.target()].method.clone(),
                call_site: e.weight().call_site,
                kind: e.weight().kind,
            })
            .collect()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[inline]
    pub fn dynamic_edge_count(&self) -> usize {
        self.dynamic_edges
    }

    /// Graphviz rendering
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[]))
    }
}
