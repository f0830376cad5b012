//! Pointer-Assignment Graph (PAG)
//!
//! One node per (context, value); edges carry the assignment kind:
//!
//! | kind      | statement        | effect                              |
//! |-----------|------------------|-------------------------------------|
//! | Address   | `x = new C`      | pts(x) ⊇ {obj}                      |
//! | Copy      | `x = y`          | pts(x) ⊇ pts(y)                     |
//! | Load      | `x = y.f`        | pts(x) ⊇ pts(o.f) for o ∈ pts(y)    |
//! | Write     | `y.f = x`        | pts(o.f) ⊇ pts(x) for o ∈ pts(y)    |
//! | This      | receiver binding | pts(this) ⊇ pts(receiver)           |
//!
//! Field-reference nodes (`y.f`) are anchors: their Load/Write edges are
//! replayed onto per-object field clones (`o.f`) as `pts(y)` grows.

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fmt;

use crate::features::call_graph::domain::FuncID;
use crate::shared::models::{FieldSignature, MethodSignature, Type};

use super::context::ContextID;

/// PAG node identifier (index of the petgraph node)
pub type NodeID = u32;

/// Context-free identity of a PAG node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PagValue {
    Local { func: FuncID, name: String },
    /// Allocation site (`new C` / `new T[]`) at a statement index
    Alloc { func: FuncID, stmt: usize },
    /// Field reference `base.field` (merged per base local and field)
    InstanceField { func: FuncID, base: String, field: String },
    StaticField { field: FieldSignature },
    Param { func: FuncID, index: usize },
    This { func: FuncID },
    /// Formal return value
    Return { func: FuncID },
    /// Function object
    FuncObject { method: MethodSignature },
    /// Object fabricated for an SDK call's return value
    SdkObject { method: MethodSignature },
    /// Field `field` of heap object `object`
    FieldClone { object: NodeID, field: String },
}

impl PagValue {
    /// Abstract heap object (can appear in points-to sets)
    #[inline]
    pub fn is_heap(&self) -> bool {
        matches!(
            self,
            PagValue::Alloc { .. } | PagValue::FuncObject { .. } | PagValue::SdkObject { .. }
        )
    }

    #[inline]
    pub fn is_field_ref(&self) -> bool {
        matches!(self, PagValue::InstanceField { .. })
    }

    /// Static fields are shared across all contexts
    #[inline]
    pub fn is_context_insensitive(&self) -> bool {
        matches!(self, PagValue::StaticField { .. })
    }

    fn field_name(&self) -> Option<&str> {
        match self {
            PagValue::InstanceField { field, .. } | PagValue::FieldClone { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagValue::Local { func, name } => write!(f, "f{}:{}", func, name),
            PagValue::Alloc { func, stmt } => write!(f, "f{}:alloc#{}", func, stmt),
            PagValue::InstanceField { func, base, field } => {
                write!(f, "f{}:{}.{}", func, base, field)
            }
            PagValue::StaticField { field } => write!(f, "static {}", field),
            PagValue::Param { func, index } => write!(f, "f{}:param{}", func, index),
            PagValue::This { func } => write!(f, "f{}:this", func),
            PagValue::Return { func } => write!(f, "f{}:ret", func),
            PagValue::FuncObject { method } => write!(f, "fn {}", method),
            PagValue::SdkObject { method } => write!(f, "sdk {}", method),
            PagValue::FieldClone { object, field } => write!(f, "o{}.{}", object, field),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PagNode {
    pub id: NodeID,
    pub ctx: ContextID,
    pub value: PagValue,
    /// Declared type (allocated class for heap objects)
    pub ty: Type,
    /// Base local node of a field reference
    pub field_base: Option<NodeID>,
}

impl PagNode {
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.value.is_heap()
    }
}

impl fmt::Display for PagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @{}", self.id, self.value, self.ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PagEdgeKind {
    Address,
    Copy,
    Load,
    Write,
    This,
}

impl PagEdgeKind {
    /// Edges along which points-to sets flow unchanged
    #[inline]
    pub fn is_copy_like(self) -> bool {
        matches!(self, PagEdgeKind::Copy | PagEdgeKind::This)
    }
}

impl fmt::Display for PagEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PagEdgeKind::Address => "addr",
            PagEdgeKind::Copy => "copy",
            PagEdgeKind::Load => "load",
            PagEdgeKind::Write => "write",
            PagEdgeKind::This => "this",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
pub struct Pag {
    graph: DiGraph<PagNode, PagEdgeKind>,
    nodes_by_key: FxHashMap<(ContextID, PagValue), NodeID>,
    by_value: FxHashMap<PagValue, Vec<NodeID>>,
    edge_keys: FxHashSet<(NodeID, NodeID, PagEdgeKind)>,
    /// Base local node -> field reference nodes on it
    base_fields: FxHashMap<NodeID, Vec<NodeID>>,
    /// Address edges in insertion order
    addr_edges: Vec<(NodeID, NodeID)>,
}

impl Pag {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Nodes
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    fn idx(id: NodeID) -> NodeIndex {
        NodeIndex::new(id as usize)
    }

    /// Node for (ctx, value), created on first request
    pub fn get_or_new_node(&mut self, ctx: ContextID, value: PagValue, ty: Type) -> NodeID {
        self.get_or_new_node_with_base(ctx, value, ty, None)
    }

    /// Field reference node on `base`
    pub fn get_or_new_field_node(
        &mut self,
        ctx: ContextID,
        value: PagValue,
        ty: Type,
        base: NodeID,
    ) -> NodeID {
        self.get_or_new_node_with_base(ctx, value, ty, Some(base))
    }

    fn get_or_new_node_with_base(
        &mut self,
        ctx: ContextID,
        value: PagValue,
        ty: Type,
        field_base: Option<NodeID>,
    ) -> NodeID {
        let key = (ctx, value);
        if let Some(&id) = self.nodes_by_key.get(&key) {
            return id;
        }
        let (ctx, value) = key;
        let id = self.graph.node_count() as NodeID;
        self.graph.add_node(PagNode {
            id,
            ctx,
            value: value.clone(),
            ty,
            field_base,
        });
        if let Some(base) = field_base {
            self.base_fields.entry(base).or_default().push(id);
        }
        self.by_value.entry(value.clone()).or_default().push(id);
        self.nodes_by_key.insert((ctx, value), id);
        id
    }

    /// Formal receiver of `func` in `ctx`
    ///
    /// Never shared across contexts: each callee instance binds its own
    /// receiver.
    pub fn get_or_new_this_node(&mut self, ctx: ContextID, func: FuncID, ty: Type) -> NodeID {
        self.get_or_new_node(ctx, PagValue::This { func }, ty)
    }

    /// Per-object clone of a field reference node
    ///
    /// Clones are keyed by (object, field name), so every access to the same
    /// field of the same object shares one node. Returns `None` when
    /// `field_node` is not a field reference.
    pub fn get_or_clone_pag_field_node(&mut self, field_node: NodeID, object: NodeID) -> Option<NodeID> {
        let field = self.node(field_node)?.value.field_name()?.to_string();
        let ctx = self.node(object)?.ctx;
        let value = PagValue::FieldClone { object, field };
        Some(self.get_or_new_node(ctx, value, Type::Unknown))
    }

    #[inline]
    pub fn node(&self, id: NodeID) -> Option<&PagNode> {
        self.graph.node_weight(Self::idx(id))
    }

    pub fn node_id(&self, ctx: ContextID, value: &PagValue) -> Option<NodeID> {
        self.nodes_by_key.get(&(ctx, value.clone())).copied()
    }

    /// All nodes of a value across contexts
    pub fn nodes_of_value(&self, value: &PagValue) -> &[NodeID] {
        self.by_value.get(value).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PagNode> {
        self.graph.node_weights()
    }

    /// Field reference nodes whose base is `base`
    pub fn field_nodes_of(&self, base: NodeID) -> &[NodeID] {
        self.base_fields.get(&base).map(|v| v.as_slice()).unwrap_or(&[])
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    /// Add an edge; false if it already existed or an endpoint is unknown
    pub fn add_edge(&mut self, src: NodeID, dst: NodeID, kind: PagEdgeKind) -> bool {
        let count = self.graph.node_count() as NodeID;
        if src >= count || dst >= count {
            return false;
        }
        if !self.edge_keys.insert((src, dst, kind)) {
            return false;
        }
        self.graph.add_edge(Self::idx(src), Self::idx(dst), kind);
        if kind == PagEdgeKind::Address {
            self.addr_edges.push((src, dst));
        }
        true
    }

    pub fn has_edge(&self, src: NodeID, dst: NodeID, kind: PagEdgeKind) -> bool {
        self.edge_keys.contains(&(src, dst, kind))
    }

    fn neighbors_by(&self, id: NodeID, dir: Direction, pred: impl Fn(PagEdgeKind) -> bool) -> Vec<NodeID> {
        if id >= self.graph.node_count() as NodeID {
            return Vec::new();
        }
        self.graph
            .edges_directed(Self::idx(id), dir)
            .filter(|e| pred(*e.weight()))
            .map(|e| match dir {
                Direction::Outgoing => e.target().index() as NodeID,
                Direction::Incoming => e.source().index() as NodeID,
            })
            .collect()
    }

    /// Targets of outgoing Copy / This edges
    pub fn copy_targets(&self, id: NodeID) -> Vec<NodeID> {
        self.neighbors_by(id, Direction::Outgoing, PagEdgeKind::is_copy_like)
    }

    /// Sources of incoming Copy / This edges
    pub fn copy_sources(&self, id: NodeID) -> Vec<NodeID> {
        self.neighbors_by(id, Direction::Incoming, PagEdgeKind::is_copy_like)
    }

    /// Destinations reading from a field reference node
    pub fn load_targets(&self, field_node: NodeID) -> Vec<NodeID> {
        self.neighbors_by(field_node, Direction::Outgoing, |k| k == PagEdgeKind::Load)
    }

    /// Sources written into a field reference node
    pub fn write_sources(&self, field_node: NodeID) -> Vec<NodeID> {
        self.neighbors_by(field_node, Direction::Incoming, |k| k == PagEdgeKind::Write)
    }

    pub fn addr_edges(&self) -> &[(NodeID, NodeID)] {
        &self.addr_edges
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edge_count_of(&self, kind: PagEdgeKind) -> usize {
        self.graph.edge_weights().filter(|k| **k == kind).count()
    }

    /// Graphviz rendering
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[]))
    }
}
