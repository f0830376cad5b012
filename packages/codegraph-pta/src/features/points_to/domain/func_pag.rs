//! Per-function PAG template
//!
//! Built once per function from its body, independent of context. Each
//! (context, function) instantiation replays the template edges with that
//! context (static fields excepted).

use crate::features::call_graph::domain::{CallSiteID, FuncID};
use crate::shared::models::{Local, MethodSignature, Type};

use super::pag::{PagEdgeKind, PagValue};

/// Context-free node reference inside a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNode {
    pub value: PagValue,
    pub ty: Type,
    /// Base local node of a field reference
    pub base: Option<Box<TemplateNode>>,
}

impl TemplateNode {
    pub fn new(value: PagValue, ty: Type) -> Self {
        Self {
            value,
            ty,
            base: None,
        }
    }

    pub fn field(value: PagValue, ty: Type, base: TemplateNode) -> Self {
        Self {
            value,
            ty,
            base: Some(Box::new(base)),
        }
    }

    /// Node of a method-local variable
    pub fn local(func: FuncID, local: &Local) -> Self {
        Self::new(
            PagValue::Local {
                func,
                name: local.name.clone(),
            },
            local.ty.clone(),
        )
    }

    /// Field reference `base.field`
    pub fn field_ref(func: FuncID, base: &Local, field: &str) -> Self {
        Self::field(
            PagValue::InstanceField {
                func,
                base: base.name.clone(),
                field: field.to_string(),
            },
            Type::Unknown,
            Self::local(func, base),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncPagEdge {
    pub src: TemplateNode,
    pub dst: TemplateNode,
    pub kind: PagEdgeKind,
    /// Statement index the edge came from
    pub stmt: usize,
}

#[derive(Debug, Clone)]
pub struct FuncPag {
    pub func: FuncID,
    pub method: MethodSignature,
    pub edges: Vec<FuncPagEdge>,
    /// Statically resolved call sites
    pub call_sites: Vec<CallSiteID>,
    /// Call sites resolved through points-to information
    pub dyn_call_sites: Vec<CallSiteID>,
    /// Local assigned from the receiver (`this = this: C`)
    pub this_local: Option<Local>,
}

impl FuncPag {
    pub fn new(func: FuncID, method: MethodSignature) -> Self {
        Self {
            func,
            method,
            edges: Vec::new(),
            call_sites: Vec::new(),
            dyn_call_sites: Vec::new(),
            this_local: None,
        }
    }

    pub fn add_edge(&mut self, src: TemplateNode, dst: TemplateNode, kind: PagEdgeKind, stmt: usize) {
        self.edges.push(FuncPagEdge {
            src,
            dst,
            kind,
            stmt,
        });
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
